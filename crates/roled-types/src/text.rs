//! Message text helpers shared by the engine and command surface

/// Wrap text in a Markdown code block for channel echo.
pub fn code_block(text: &str) -> String {
    format!("```\n{}\n```", text)
}

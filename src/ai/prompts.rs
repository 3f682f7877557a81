//! Prompt templates sent to the model

/// Number of questions requested per quiz
pub const QUIZ_QUESTION_COUNT: usize = 5;

/// Image analysis prompt
pub const IMAGE_ANALYSIS: &str = "Analyze this image in detail and provide:
1. Main subject or focus
2. Key objects and elements
3. Colors and visual composition
4. Any text visible in the image
5. Context or setting
6. Notable details or unique features
7. Overall mood or atmosphere

Please be specific and descriptive.";

/// Voice transcription prompt
pub const TRANSCRIPTION: &str = "Transcribe this voice message word for word. \
Reply with the transcription only, without commentary or quotation marks. \
If nothing intelligible is said, reply with an empty message.";

/// PDF analysis prompt over already extracted text
pub fn pdf_analysis(content: &str) -> String {
    format!(
        "Analyze this PDF content and provide:
1. Main topic or subject
2. Key points and information
3. Important details
4. Structure and organization
5. Summary of content

Content: {}",
        content
    )
}

/// Plain-text file analysis prompt
pub fn text_analysis(content: &str) -> String {
    format!("Analyze this text content:\n{}", content)
}

/// Search-results summary prompt
pub fn search_summary(query: &str, results_text: &str) -> String {
    format!(
        "Summarize these search results for '{}':\n\n{}",
        query, results_text
    )
}

/// Quiz generation prompt; the layout is what `quiz::parse_questions` reads
pub fn quiz(topic: &str) -> String {
    format!(
        "Generate a multiple-choice quiz on {topic}. Provide {count} questions, each with 4 options and the correct answer.

Use exactly this plain-text layout, with one blank line between questions and no other text:
Question text
A) first option
B) second option
C) third option
D) fourth option
Correct Answer: <letter>",
        topic = topic,
        count = QUIZ_QUESTION_COUNT
    )
}

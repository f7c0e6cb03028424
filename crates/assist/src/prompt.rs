//! Prompt text sent with each request.
//! 每個請求附帶的提示文字。

use crate::types::{CompletionRequest, DiagnosisRequest};

pub fn completion_prompt(request: &CompletionRequest) -> String {
    format!(
        "You are an AI code assistant that provides code completions, refactoring suggestions, and explanations.\n\n\
         Based on the current file content, cursor context, and programming language, provide a code completion \
         suggestion that seamlessly integrates with the existing code.\n\
         Also provide an optional explanation of the suggestion.\n\n\
         Language: {language}\n\
         File Content:\n{content}\n\n\
         Cursor Context:\n{cursor}\n\n\
         Suggestion:",
        language = request.language,
        content = request.file_content,
        cursor = request.cursor_context,
    )
}

pub fn diagnosis_prompt(request: &DiagnosisRequest) -> String {
    format!(
        "You are an AI code analyzer. Analyze the following code for potential bugs and security issues. \
         Provide suggestions for fixing the identified issues and improving the code.\n\n\
         Language: {language}\n\
         Code:\n{code}",
        language = request.language,
        code = request.code,
    )
}

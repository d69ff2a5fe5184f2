use crate::llm::Message;

/// Exact text the model must return when the context has no answer.
pub const REFUSAL: &str = "I can not answer this based on the provided context.";

pub const SYSTEM_PROMPT: &str = r#"You are a helpful assistant.
Rules:
1. You must answer the user's question using ONLY the context provided.
2. Do NOT use your internal training data, common sense, or prior knowledge.
3. If the answer is not present in the context, strictly output: "I can not answer this based on the provided context.""#;

/// The user turn: extracted context followed by the literal question.
pub fn user_prompt(context: &str, question: &str) -> String {
    format!("context: {}\nquestion: {}", context, question)
}

/// System policy first, then the grounded user turn.
pub fn build_messages(context: &str, question: &str) -> Vec<Message> {
    vec![
        Message::system(SYSTEM_PROMPT),
        Message::user(user_prompt(context, question)),
    ]
}

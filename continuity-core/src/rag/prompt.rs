//! Prompt assembly for retrieval-augmented generation.

use super::{ChatMessage, ScoredDocument};

/// How many trailing history messages are carried into the prompt.
const HISTORY_WINDOW: usize = 5;

/// Builds generation prompts from context documents and chat history.
pub struct PromptBuilder;

impl PromptBuilder {
    /// Build a full RAG prompt: persona, ranked context, recent history,
    /// and the current question.
    pub fn build_rag_prompt(
        query: &str,
        context: &[ScoredDocument],
        history: &[ChatMessage],
    ) -> String {
        let mut prompt = String::from(
            "You are a story continuity assistant. Answer questions directly and \
             concisely using the provided context. Do not explain your reasoning \
             process - just give the answer in a natural, conversational way.\n\n",
        );

        if !context.is_empty() {
            prompt.push_str("## Context Information:\n");
            for (i, doc) in context.iter().enumerate() {
                // Scores are distances; display as relevance.
                prompt.push_str(&format!(
                    "\n[Document {} - Relevance: {:.2}]\n{}\n",
                    i + 1,
                    1.0 - doc.score,
                    doc.text
                ));
            }
            prompt.push_str("\n---\n\n");
        }

        if !history.is_empty() {
            prompt.push_str("## Conversation History:\n");
            let skip = history.len().saturating_sub(HISTORY_WINDOW);
            for message in &history[skip..] {
                prompt.push_str(&format!(
                    "{}: {}\n",
                    capitalize(&message.role),
                    message.content
                ));
            }
            prompt.push_str("\n---\n\n");
        }

        prompt.push_str(&format!("## Current Question:\nUser: {query}\n\nAssistant: "));
        prompt
    }

    /// Build a bare prompt without any context.
    pub fn build_simple_prompt(query: &str) -> String {
        format!("User: {query}\n\nAssistant: ")
    }

    /// Build a prompt asking the model to pick one category for a query.
    pub fn build_classification_prompt(query: &str, categories: &[&str]) -> String {
        let list: String = categories
            .iter()
            .map(|c| format!("- {c}\n"))
            .collect();
        format!(
            "Classify the following query into one of these categories:\n\
             {list}\nQuery: {query}\n\nCategory: "
        )
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(text: &str, score: f64) -> ScoredDocument {
        ScoredDocument {
            id: "doc_1".to_string(),
            text: text.to_string(),
            score,
        }
    }

    #[test]
    fn test_rag_prompt_sections() {
        let history = vec![
            ChatMessage::new("user", "Who is Elena?"),
            ChatMessage::new("assistant", "The lighthouse keeper."),
        ];
        let prompt = PromptBuilder::build_rag_prompt(
            "Where does she live?",
            &[doc("Elena tends the lighthouse.", 0.25)],
            &history,
        );

        assert!(prompt.contains("## Context Information:"));
        assert!(prompt.contains("[Document 1 - Relevance: 0.75]"));
        assert!(prompt.contains("## Conversation History:"));
        assert!(prompt.contains("User: Who is Elena?"));
        assert!(prompt.contains("Assistant: The lighthouse keeper."));
        assert!(prompt.ends_with("## Current Question:\nUser: Where does she live?\n\nAssistant: "));
    }

    #[test]
    fn test_rag_prompt_without_context_skips_section() {
        let prompt = PromptBuilder::build_rag_prompt("Hello?", &[], &[]);
        assert!(!prompt.contains("## Context Information:"));
        assert!(!prompt.contains("## Conversation History:"));
        assert!(prompt.contains("## Current Question:"));
    }

    #[test]
    fn test_history_window_keeps_last_five() {
        let history: Vec<ChatMessage> = (0..8)
            .map(|i| ChatMessage::new("user", format!("message {i}")))
            .collect();
        let prompt = PromptBuilder::build_rag_prompt("q", &[], &history);
        assert!(!prompt.contains("message 2"));
        assert!(prompt.contains("message 3"));
        assert!(prompt.contains("message 7"));
    }

    #[test]
    fn test_classification_prompt() {
        let prompt =
            PromptBuilder::build_classification_prompt("who is elena", &["lore", "smalltalk"]);
        assert!(prompt.contains("- lore"));
        assert!(prompt.contains("Query: who is elena"));
        assert!(prompt.ends_with("Category: "));
    }
}

//! Prompt assembly for grounded answering.

use super::retrieval::RetrievedContext;
use crate::llm::ChatMessage;

pub const SYSTEM_PROMPT: &str = "You are a helpful technical support assistant that answers questions based on product manuals and documentation.

Your responses must:
1. Be accurate and based only on the provided context
2. Cite the numbered sources when referencing information
3. If the context doesn't contain enough information, say so clearly
4. Be concise but complete
5. Use the source documents to provide precise technical details

Always ground your answers in the provided context. Do not make up information that isn't in the context, and never cite a document that does not appear there.";

/// Fixed reply used when retrieval finds nothing relevant. Emitted without
/// calling the model, so no citation can be fabricated.
pub const INSUFFICIENT_CONTEXT_ANSWER: &str =
    "I couldn't find relevant information in the documentation for your question.";

/// Renders the context bundle with numbered source markers.
pub fn format_context(context: &RetrievedContext) -> String {
    context
        .entries
        .iter()
        .enumerate()
        .map(|(idx, entry)| {
            format!(
                "[{}] (Source: {})\n{}",
                idx + 1,
                entry.parent.document_name,
                entry.parent.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}

/// Builds the full message list: system prompt, prior turns, then the
/// context-grounded question.
pub fn build_messages(
    query: &str,
    context: &RetrievedContext,
    history: &[ChatMessage],
) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage::system(SYSTEM_PROMPT));
    messages.extend(history.iter().cloned());
    messages.push(ChatMessage::user(format!(
        "Context from documentation:\n{}\n\nQuestion: {}\n\nAnswer based on the context above:",
        format_context(context),
        query
    )));
    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::retrieval::ContextEntry;
    use crate::store::ParentRecord;

    fn context_with(parents: &[(&str, &str, &str)]) -> RetrievedContext {
        RetrievedContext {
            entries: parents
                .iter()
                .enumerate()
                .map(|(idx, (id, name, content))| ContextEntry {
                    parent: ParentRecord {
                        id: id.to_string(),
                        document_id: format!("doc-{idx}"),
                        document_name: name.to_string(),
                        content: content.to_string(),
                        seq_index: idx as i64,
                        ordinal: idx as i64,
                    },
                    score: 0.9,
                })
                .collect(),
        }
    }

    #[test]
    fn context_entries_get_numbered_source_markers() {
        let context = context_with(&[
            ("p1", "washer.txt", "Open the filter hatch."),
            ("p2", "dryer.txt", "Clean the lint trap."),
        ]);

        let rendered = format_context(&context);
        assert!(rendered.contains("[1] (Source: washer.txt)\nOpen the filter hatch."));
        assert!(rendered.contains("[2] (Source: dryer.txt)\nClean the lint trap."));
        assert!(rendered.contains("\n\n---\n\n"));
    }

    #[test]
    fn message_list_is_system_history_question() {
        let context = context_with(&[("p1", "washer.txt", "Open the filter hatch.")]);
        let history = vec![
            ChatMessage::user("Where is the filter?"),
            ChatMessage::assistant("Behind the front hatch."),
        ];

        let messages = build_messages("How often should I clean it?", &context, &history);

        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[1].content, "Where is the filter?");
        assert_eq!(messages[2].role, "assistant");
        assert!(messages[3].content.starts_with("Context from documentation:"));
        assert!(messages[3].content.contains("How often should I clean it?"));
        assert!(messages[3].content.ends_with("Answer based on the context above:"));
    }
}

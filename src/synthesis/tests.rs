use super::*;

#[test]
fn prompt_labels_context_and_question() {
    let prompt = build_prompt("TimescaleDB is a time-series database.", "What is TimescaleDB?");

    assert!(prompt.starts_with("Context:"));
    assert!(prompt.contains("TimescaleDB is a time-series database."));
    assert!(prompt.contains("Question: What is TimescaleDB?"));
}

#[test]
fn prompt_keeps_question_verbatim() {
    let question = "  Why? (exact punctuation & spacing)  ";
    let prompt = build_prompt("ctx", question);

    assert!(prompt.contains(&format!("Question: {}", question)));
}

#[test]
fn prompt_instructs_against_fabrication() {
    let prompt = build_prompt("", "anything?");
    assert!(prompt.contains("only the context above"));
    assert!(prompt.contains("instead of inventing"));
}

#[test]
fn prompt_is_deterministic() {
    let a = build_prompt("same context", "same question");
    let b = build_prompt("same context", "same question");
    assert_eq!(a, b);
}

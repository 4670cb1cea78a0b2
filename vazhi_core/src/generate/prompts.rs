//! Prompt templates.

/// Asks for a single routing label for `query`.
pub fn topic_routing_prompt(query: &str) -> String {
    format!(
        r#"You are a routing classifier.

Classify the user's query into exactly ONE of these categories:
- academic      : research-level, papers, theory, algorithms, math, scientific topics
- general       : broad knowledge, definitions, history, how-things-work, biographies
- current_events: news, latest developments, recent incidents, 'today', 'this year', etc.

Return ONLY one word: academic, general, or current_events.

Query:
{query}
"#
    )
}

/// Grounded answer over a formatted context.
pub fn answer_prompt(context: &str, question: &str, instructions: &str) -> String {
    format!(
        r#"You are a helpful research assistant. Answer the question using the context below.
{instructions}
Do not invent sources or dates.

Context:
{context}

Question:
{question}

Answer:"#
    )
}

/// News analyst digest over a sectioned context.
pub fn digest_prompt(topic: &str, context: &str) -> String {
    format!(
        r#"You are an AI news analyst.

User topic:
{topic}

You have two types of context, each under its own heading:

{context}

Write a clear, comprehensive summary that includes:

1) A short overview (2-3 sentences) of what is happening related to this topic.
2) 3-5 bullet points describing the most important recent developments.
3) 2-3 bullet points giving background so a non-expert can understand why these developments matter.
4) If anything is uncertain or evolving, briefly mention it.

Stay factual and concise. Do not invent sources or dates."#
    )
}

pub fn fact_check_prompt(context: &str, statement: &str) -> String {
    format!(
        r#"You are a careful fact-checking assistant.

Use ONLY the information in the context below to decide if the statement is accurate.
If the context does not clearly confirm or refute the statement, answer "Unknown".

Context:
{context}

Statement to verify:
"{statement}"

Respond in the following format:

Verdict: [True/False/Unknown]
Explanation: [brief explanation based only on the context]"#
    )
}

pub fn paper_summary_prompt(title: &str, authors: &str, abstract_text: &str) -> String {
    format!(
        r#"You are helping with an academic literature review.

Summarize the following paper abstract in 3-5 concise bullet points.
Focus on:
- Problem the paper addresses
- Main method/approach
- Key results or contributions
- Any notable applications

Title: {title}
Authors: {authors}

Abstract:
{abstract_text}

Return only the bullet-point summary."#
    )
}

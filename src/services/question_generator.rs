use crate::models::question::Question;
use crate::services::llm_service::{AgentRole, AgentRunner};
use crate::utils::fanout::run_all;
use crate::utils::llm_output::{parse_questions, QuestionDefaults};
use crate::utils::partition::{split_counts, worker_count};
use crate::utils::text::truncate_chars;
use std::sync::Arc;

/// Characters of source text kept on each question as provenance.
const PROVENANCE_CHARS: usize = 200;

/// Parameters of one generation fan-out.
#[derive(Debug, Clone)]
pub struct QuestionBatchRequest<'a> {
    pub prompt: &'a str,
    pub chunks: &'a [String],
    pub used_chunks: bool,
    pub num_of_q: usize,
    pub batch_size: usize,
    pub academy: i64,
    pub topic: i64,
    pub llm_model: &'a str,
    pub has4questions: bool,
    /// First `order` value handed out in this batch.
    pub start_order: i64,
}

/// What a single generation worker is asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerAssignment {
    pub question_count: usize,
    /// Index into the chunk list; `None` means prompt-only.
    pub chunk_index: Option<usize>,
}

/// Splits `num_of_q` over at most `batch_size` workers and hands out chunks
/// round-robin. Without usable chunks every worker runs prompt-only.
pub fn plan_workers(
    num_of_q: usize,
    batch_size: usize,
    chunk_count: usize,
    used_chunks: bool,
) -> Vec<WorkerAssignment> {
    let workers = worker_count(batch_size, num_of_q);
    split_counts(num_of_q, workers)
        .into_iter()
        .enumerate()
        .map(|(i, question_count)| WorkerAssignment {
            question_count,
            chunk_index: (used_chunks && chunk_count > 0).then(|| i % chunk_count),
        })
        .collect()
}

#[derive(Clone)]
pub struct QuestionGenerator {
    agent: Arc<dyn AgentRunner>,
}

impl QuestionGenerator {
    pub fn new(agent: Arc<dyn AgentRunner>) -> Self {
        Self { agent }
    }

    /// Runs all generation workers concurrently and merges their questions in
    /// worker order, numbering them densely from `start_order`.
    ///
    /// A failed worker contributes nothing and takes no order values. Fewer
    /// questions than requested is logged, not an error.
    pub async fn generate(&self, req: &QuestionBatchRequest<'_>) -> Vec<Question> {
        let plan = plan_workers(req.num_of_q, req.batch_size, req.chunks.len(), req.used_chunks);
        if plan.is_empty() {
            return Vec::new();
        }
        tracing::info!(
            workers = plan.len(),
            num_of_q = req.num_of_q,
            chunks = req.chunks.len(),
            "Launching question generation workers"
        );

        let tasks = plan.iter().enumerate().map(|(idx, assignment)| {
            let chunk = assignment.chunk_index.map(|c| req.chunks[c].as_str());
            tracing::debug!(
                worker = idx,
                chunk = ?assignment.chunk_index,
                questions = assignment.question_count,
                "Worker assigned"
            );

            let agent = Arc::clone(&self.agent);
            let prompt = question_prompt(req, assignment.question_count, chunk);
            let model = req.llm_model.to_string();
            let academy = req.academy;
            let topic = req.topic;
            let has4questions = req.has4questions;
            let provenance = truncate_chars(chunk.unwrap_or(req.prompt), PROVENANCE_CHARS);

            async move {
                let raw = agent
                    .run(AgentRole::QuestionWriter, &prompt, Some(&model))
                    .await?;
                let defaults = QuestionDefaults {
                    academy,
                    topic,
                    llm_model: &model,
                    has4questions,
                    question_prompt: provenance,
                };
                parse_questions(&raw, &defaults)
            }
        });

        let mut next_order = req.start_order;
        let mut questions = Vec::with_capacity(req.num_of_q);
        for (idx, result) in run_all(tasks).await.into_iter().enumerate() {
            match result {
                Ok(batch) => {
                    tracing::debug!(worker = idx, questions = batch.len(), "Worker finished");
                    for mut question in batch {
                        question.order = next_order;
                        next_order += 1;
                        questions.push(question);
                    }
                }
                Err(e) => {
                    tracing::warn!(worker = idx, error = %e, "Generation worker failed");
                }
            }
        }

        if questions.len() < req.num_of_q {
            tracing::warn!(
                generated = questions.len(),
                requested = req.num_of_q,
                "Generated fewer questions than requested"
            );
        } else {
            tracing::info!(generated = questions.len(), "Question generation finished");
        }
        questions
    }
}

fn question_prompt(req: &QuestionBatchRequest<'_>, count: usize, chunk: Option<&str>) -> String {
    let source = match chunk {
        Some(text) => format!(
            r#"Generate {count} questions based on the following specific text:

"{text}"

IMPORTANT:
- Focus ONLY on the content of the text provided
- Make the questions varied and different from each other
- Make each question address a different aspect of the text"#
        ),
        None => format!(
            "Generate {count} questions. Make them varied and different from each other."
        ),
    };
    let answer4 = if req.has4questions {
        "\"Fourth option\""
    } else {
        "null"
    };

    format!(
        r#"{prompt}
{source}

Return EXACTLY this JSON format:
{{
    "questions": [
        {{
            "academy": {academy},
            "question": "Question text here",
            "answer1": "First option",
            "answer2": "Second option",
            "answer3": "Third option",
            "answer4": {answer4},
            "solution": 1,
            "tip": "Optional hint",
            "topic": {topic},
            "llm_model": "{model}"
        }}
    ]
}}
"solution" is the 1-based index of the correct answer."#,
        prompt = req.prompt,
        academy = req.academy,
        topic = req.topic,
        model = req.llm_model,
    )
}

use crate::config::FeedbackMerge;
use crate::error::Result;
use crate::models::question::{FeedbackItem, Question};
use crate::services::llm_service::{AgentRole, AgentRunner};
use crate::utils::fanout::run_all;
use crate::utils::llm_output::parse_string_list;
use crate::utils::partition::{split_ranges, worker_count};
use std::ops::Range;
use std::sync::Arc;

#[derive(Clone)]
pub struct FeedbackService {
    agent: Arc<dyn AgentRunner>,
    merge: FeedbackMerge,
}

impl FeedbackService {
    pub fn new(agent: Arc<dyn AgentRunner>) -> Self {
        Self {
            agent,
            merge: FeedbackMerge::default(),
        }
    }

    pub fn with_merge(mut self, merge: FeedbackMerge) -> Self {
        self.merge = merge;
        self
    }

    /// Asks the feedback agents for one explanation per question and returns
    /// the questions, same length and order, with `tip` set.
    ///
    /// In positional mode all workers' feedback is concatenated and zipped
    /// with the question list by index, so a worker that fails or returns a
    /// miscounted list shifts every later tip. Questions past the end of the
    /// feedback list keep their previous tip.
    pub async fn generate_feedback(
        &self,
        questions: &[Question],
        academy: i64,
        topic: i64,
        batch_size: usize,
    ) -> Vec<Question> {
        if questions.is_empty() {
            return Vec::new();
        }
        let slices = split_ranges(questions.len(), worker_count(batch_size, questions.len()));
        tracing::info!(
            workers = slices.len(),
            questions = questions.len(),
            academy,
            topic,
            "Launching feedback workers"
        );

        let tasks = slices.iter().map(|range| {
            let agent = Arc::clone(&self.agent);
            let prompt = feedback_prompt(&questions[range.clone()], academy, topic);
            async move {
                let prompt = prompt?;
                let raw = agent.run(AgentRole::FeedbackWriter, &prompt, None).await?;
                parse_string_list(&raw, "feedbacks")
            }
        });

        let per_worker: Vec<Vec<String>> = run_all(tasks)
            .await
            .into_iter()
            .enumerate()
            .map(|(idx, result)| match result {
                Ok(feedbacks) => {
                    let expected = slices[idx].len();
                    if feedbacks.len() != expected {
                        tracing::warn!(
                            worker = idx,
                            expected,
                            returned = feedbacks.len(),
                            "Feedback count does not match slice size"
                        );
                    }
                    feedbacks
                }
                Err(e) => {
                    tracing::warn!(worker = idx, error = %e, "Feedback worker failed");
                    Vec::new()
                }
            })
            .collect();

        let merged = match self.merge {
            FeedbackMerge::Positional => merge_positional(questions, per_worker),
            FeedbackMerge::SliceAligned => merge_slice_aligned(questions, &slices, per_worker),
        };
        let with_tips = merged.iter().filter(|q| q.tip.is_some()).count();
        tracing::info!(with_tips, questions = merged.len(), "Feedback merged");
        merged
    }
}

/// Concatenates worker output in worker order and zips it by index.
pub fn merge_positional(questions: &[Question], per_worker: Vec<Vec<String>>) -> Vec<Question> {
    let mut feedbacks = per_worker.into_iter().flatten();
    questions
        .iter()
        .map(|q| match feedbacks.next() {
            Some(tip) => q.with_tip(tip),
            None => q.clone(),
        })
        .collect()
}

/// Zips each worker's output only against its own slice; extra strings are
/// discarded and missing ones leave the prior tip.
pub fn merge_slice_aligned(
    questions: &[Question],
    slices: &[Range<usize>],
    per_worker: Vec<Vec<String>>,
) -> Vec<Question> {
    let mut merged = questions.to_vec();
    for (range, feedbacks) in slices.iter().zip(per_worker) {
        for (slot, tip) in merged[range.clone()].iter_mut().zip(feedbacks) {
            *slot = slot.with_tip(tip);
        }
    }
    merged
}

fn feedback_prompt(slice: &[Question], academy: i64, topic: i64) -> Result<String> {
    let items: Vec<FeedbackItem<'_>> = slice.iter().map(FeedbackItem::from).collect();
    let payload = serde_json::to_string_pretty(&items)?;
    Ok(format!(
        r#"Write the feedback for these {count} questions (academy {academy}, topic {topic}).
"solution" is the 1-based index of the correct answer.

{payload}

Return EXACTLY this JSON format, one entry per question in the same order:
{{
    "feedbacks": [
        "feedback for question 1",
        "feedback for question 2"
    ]
}}"#,
        count = slice.len(),
    ))
}

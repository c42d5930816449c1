pub mod chunk_service;
pub mod embed_service;
pub mod feedback_service;
pub mod llm_service;
pub mod question_generator;
pub mod question_service;
pub mod question_store;
pub mod rag_service;
pub mod vector_search_service;

#[cfg(test)]
pub(crate) mod fake_agent;

pub mod fanout;
pub mod llm_output;
pub mod partition;
pub mod text;

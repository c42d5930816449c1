pub mod generation_request;
pub mod question;
pub mod retrieved_document;

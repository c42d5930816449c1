pub mod generation_dto;

// Data models and DTOs
// Processor wire types, webhook payloads, API request/response models

pub mod invoice;
pub mod notification;
pub mod webhook;

pub mod absences;
pub mod backup_exchange;
pub mod calendar;
pub mod core;
pub mod curriculum;
pub mod defaulters;
pub mod exams;
pub mod export;
pub mod grades;
pub mod keyboard;
pub mod local_legacy;
pub mod memos;
pub mod notes;
pub mod settings;
pub mod students;
pub mod transfer;

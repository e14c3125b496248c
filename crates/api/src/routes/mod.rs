pub mod diarization;
pub mod form;
pub mod system;
pub mod transcription;
pub mod translation;

pub mod fixtures;

#[cfg(test)]
mod diarization_tests;
#[cfg(test)]
mod system_tests;
#[cfg(test)]
mod transcription_tests;
#[cfg(test)]
mod translation_tests;
#[cfg(test)]
mod ws_tests;

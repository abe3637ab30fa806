pub mod capture;
pub mod file;
pub mod wav;

pub use capture::{AudioChunk, CaptureConfig, CaptureDevice, ChannelCapture, FileCapture};
pub use file::AudioFile;
pub use wav::{encode_wav, write_wav_file, RecordingPayload};

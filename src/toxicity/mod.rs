// Toxicity classification: trait-based abstraction for swappable providers.
//
// TextClassifier is the capability: text in, single best label out. The
// local ONNX roberta model is the default; HttpClassifier talks to a
// Hugging Face style inference endpoint. HateSpeechFilter turns the label
// into the yes/no judgment the gate needs.

pub mod hate;
pub mod http;
pub mod onnx;
pub mod rate_limiter;
pub mod traits;

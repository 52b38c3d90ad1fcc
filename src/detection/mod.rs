// Object detection: trait-based abstraction over swappable detectors.
//
// ObjectDetector is the capability: image in, labelled boxes out. The local
// YOLOv5s ONNX model is the default; HttpDetector forwards to a remote
// service with the same contract. WeaponFilter narrows raw detections down
// to the weapon vocabulary.

pub mod http;
pub mod traits;
pub mod weapons;
pub mod yolo;

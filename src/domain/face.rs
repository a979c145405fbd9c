use serde::{Deserialize, Serialize};

/// Fixed length vector describing one detected face.
pub type Descriptor = Vec<f32>;

/// Face location in pixels, serialized as `[top, right, bottom, left]`.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(from = "[i32; 4]", into = "[i32; 4]")]
pub struct FaceBox {
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
    pub left: i32,
}

impl From<[i32; 4]> for FaceBox {
    fn from(value: [i32; 4]) -> Self {
        FaceBox { top: value[0], right: value[1], bottom: value[2], left: value[3] }
    }
}

impl From<FaceBox> for [i32; 4] {
    fn from(value: FaceBox) -> Self {
        [value.top, value.right, value.bottom, value.left]
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DetectedFace {
    pub descriptor: Descriptor,
    #[serde(rename = "box")]
    pub bbox: FaceBox,
}

/// Little endian `f32` bytes. Two descriptors are the same set member only
/// when their encodings are byte equal.
pub fn descriptor_to_bytes(descriptor: &[f32]) -> Vec<u8> {
    descriptor.iter().flat_map(|v| v.to_le_bytes()).collect()
}

pub fn descriptor_from_bytes(bytes: &[u8]) -> Descriptor {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_serialization() {
        let bbox = FaceBox { top: 10, right: 80, bottom: 90, left: 5 };
        let json = serde_json::to_string(&bbox).unwrap();
        assert_eq!(json, "[10,80,90,5]");
        let face: DetectedFace = serde_json::from_str(r#"{"descriptor":[0.5,-1.0],"box":[1,2,3,4]}"#).unwrap();
        assert_eq!(face.bbox, FaceBox { top: 1, right: 2, bottom: 3, left: 4 });
        assert_eq!(face.descriptor, vec![0.5, -1.0]);
    }

    #[test]
    fn descriptor_bytes() {
        let descriptor = vec![0.1f32, -2.5, 3.0e-7];
        let bytes = descriptor_to_bytes(&descriptor);
        assert_eq!(bytes.len(), 12);
        assert_eq!(descriptor_from_bytes(&bytes), descriptor);
    }
}

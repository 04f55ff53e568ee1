/// Share codes: a whole puzzle as one copy-pasteable string.
///
/// ## Format
///   base64( JSON `{"size":8,"bitDepth":1,"legend":{"0":0,"1":1},"cells":[...]}` )
///
/// This is a plain reversible encoding, not a protection of any kind.
/// Decoding insists on all four fields and on their consistency, and
/// reports every problem as `MalformedShareCode`.
///
/// A share code can ride in a URL fragment behind `#mosaic=`.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use super::error::{CodecError, Result};
use super::grid::{BitDepth, Grid, MAX_GRID_SIZE};
use super::legend::ValueLegend;

pub const FRAGMENT_PREFIX: &str = "#mosaic=";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SharePayload {
    pub grid: Grid,
    pub legend: ValueLegend,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireOut<'a> {
    size: usize,
    bit_depth: u8,
    legend: &'a BTreeMap<String, u8>,
    cells: &'a [u8],
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireIn {
    size: Option<usize>,
    bit_depth: Option<u8>,
    legend: Option<BTreeMap<String, u8>>,
    cells: Option<Vec<u8>>,
}

impl SharePayload {
    /// Fails if the legend's depth differs from the grid's or some cell
    /// value has no code in the legend.
    pub fn new(grid: Grid, legend: ValueLegend) -> Result<Self> {
        if legend.depth() != grid.depth() {
            return Err(CodecError::DepthMismatch {
                expected: grid.depth().into(),
                actual: legend.depth().into(),
            });
        }
        if let Some(v) = grid.cells().iter().find(|v| legend.code_for(**v).is_none()) {
            return Err(CodecError::malformed(format!("legend has no code for value {v}")));
        }
        Ok(SharePayload { grid, legend })
    }

    pub fn encode(&self) -> String {
        let wire = WireOut {
            size: self.grid.size(),
            bit_depth: self.grid.depth().into(),
            legend: self.legend.as_map(),
            cells: self.grid.cells(),
        };
        // Serializing plain integers and string keys cannot fail.
        let json = serde_json::to_string(&wire).unwrap_or_default();
        STANDARD.encode(json.as_bytes())
    }

    pub fn decode(code: &str) -> Result<Self> {
        let bytes = STANDARD
            .decode(code.trim().as_bytes())
            .map_err(|e| CodecError::malformed(format!("not base64 ({e})")))?;
        let wire: WireIn = serde_json::from_slice(&bytes)
            .map_err(|e| CodecError::malformed(format!("not a puzzle ({e})")))?;

        let size = wire.size.ok_or_else(|| CodecError::malformed("missing size"))?;
        let bits = wire.bit_depth.ok_or_else(|| CodecError::malformed("missing bitDepth"))?;
        let map = wire.legend.ok_or_else(|| CodecError::malformed("missing legend"))?;
        let cells = wire.cells.ok_or_else(|| CodecError::malformed("missing cells"))?;

        if !(1..=MAX_GRID_SIZE).contains(&size) {
            return Err(CodecError::malformed(format!("size {size} is outside 1..={MAX_GRID_SIZE}")));
        }
        let depth = BitDepth::try_from(bits).map_err(CodecError::malformed)?;
        let legend = ValueLegend::from_map(map)
            .map_err(|e| CodecError::malformed(format!("bad legend ({e})")))?;
        let grid = Grid::from_cells(size, depth, cells).ok_or_else(|| {
            CodecError::malformed(format!("cells do not fill a {size}x{size} {bits}-bit grid"))
        })?;

        SharePayload::new(grid, legend).map_err(|e| match e {
            CodecError::MalformedShareCode { .. } => e,
            other => CodecError::malformed(other.to_string()),
        })
    }

    /// `#mosaic=<code>`
    pub fn to_fragment(&self) -> String {
        format!("{}{}", FRAGMENT_PREFIX, self.encode())
    }
}

/// Pull the share code out of a bare code, a `#mosaic=` fragment, or a
/// whole URL carrying that fragment.
pub fn extract_code(input: &str) -> &str {
    let input = input.trim();
    match input.find(FRAGMENT_PREFIX) {
        Some(pos) => &input[pos + FRAGMENT_PREFIX.len()..],
        None => input.strip_prefix(&FRAGMENT_PREFIX[1..]).unwrap_or(input),
    }
}

/// Share code from a URL fragment, if it carries one.
pub fn from_fragment(fragment: &str) -> Option<Result<SharePayload>> {
    let fragment = fragment.trim();
    if !fragment.contains(FRAGMENT_PREFIX) {
        return None;
    }
    Some(SharePayload::decode(extract_code(fragment)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SharePayload {
        let cells = (0..64).map(|i| ((i / 8 + i % 8) % 2) as u8).collect();
        let grid = Grid::from_cells(8, BitDepth::One, cells).unwrap();
        SharePayload::new(grid, ValueLegend::identity(BitDepth::One)).unwrap()
    }

    fn wire(json: &str) -> String {
        STANDARD.encode(json)
    }

    #[test]
    fn round_trips_exactly() {
        let payload = sample();
        assert_eq!(SharePayload::decode(&payload.encode()).unwrap(), payload);
    }

    #[test]
    fn round_trips_non_identity_legend() {
        let grid = Grid::from_cells(2, BitDepth::Two, vec![0, 1, 2, 3]).unwrap();
        let legend = ValueLegend::parse("00=3\n01=2\n10=1\n11=0").unwrap();
        let payload = SharePayload::new(grid, legend).unwrap();
        assert_eq!(SharePayload::decode(&payload.encode()).unwrap(), payload);
    }

    #[test]
    fn json_uses_camel_case_fields() {
        let json = STANDARD.decode(sample().encode()).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&json).unwrap();
        assert_eq!(value["size"], 8);
        assert_eq!(value["bitDepth"], 1);
        assert_eq!(value["legend"]["1"], 1);
        assert_eq!(value["cells"].as_array().map(Vec::len), Some(64));
    }

    #[test]
    fn each_missing_field_is_named() {
        let cases = [
            (r#"{"bitDepth":1,"legend":{"0":0,"1":1},"cells":[0]}"#, "missing size"),
            (r#"{"size":1,"legend":{"0":0,"1":1},"cells":[0]}"#, "missing bitDepth"),
            (r#"{"size":1,"bitDepth":1,"cells":[0]}"#, "missing legend"),
            (r#"{"size":1,"bitDepth":1,"legend":{"0":0,"1":1}}"#, "missing cells"),
        ];
        for (json, reason) in cases {
            assert_eq!(
                SharePayload::decode(&wire(json)).unwrap_err(),
                CodecError::MalformedShareCode { reason: reason.into() }
            );
        }
    }

    #[test]
    fn garbage_is_malformed() {
        for code in ["not base64 at all!", &wire("[1,2,3]"), &wire("{")] {
            assert!(matches!(
                SharePayload::decode(code),
                Err(CodecError::MalformedShareCode { .. })
            ));
        }
    }

    #[test]
    fn inconsistent_payloads_are_malformed() {
        let cases = [
            r#"{"size":2,"bitDepth":3,"legend":{"0":0,"1":1},"cells":[0,0,0,0]}"#,
            r#"{"size":2,"bitDepth":1,"legend":{"0":0},"cells":[0,0,0,0]}"#,
            r#"{"size":2,"bitDepth":1,"legend":{"0":0,"1":1},"cells":[0,0,0]}"#,
            r#"{"size":2,"bitDepth":1,"legend":{"0":0,"1":1},"cells":[0,0,0,2]}"#,
            r#"{"size":1,"bitDepth":1,"legend":{"00":0,"01":1,"10":2,"11":3},"cells":[0]}"#,
            r#"{"size":1,"bitDepth":1,"legend":{"0":0,"1":0},"cells":[1]}"#,
        ];
        for json in cases {
            assert!(
                matches!(SharePayload::decode(&wire(json)), Err(CodecError::MalformedShareCode { .. })),
                "{json}"
            );
        }
    }

    #[test]
    fn oversized_or_overflowing_size_is_malformed() {
        let huge = r#"{"size":4294967296,"bitDepth":1,"legend":{"0":0,"1":1},"cells":[]}"#;
        assert_eq!(
            SharePayload::decode(&wire(huge)).unwrap_err(),
            CodecError::MalformedShareCode { reason: "size 4294967296 is outside 1..=16".into() }
        );

        let cells = vec!["0"; 40 * 40].join(",");
        let forty = format!(r#"{{"size":40,"bitDepth":1,"legend":{{"0":0,"1":1}},"cells":[{cells}]}}"#);
        assert!(matches!(
            SharePayload::decode(&wire(&forty)),
            Err(CodecError::MalformedShareCode { .. })
        ));

        let zero = r#"{"size":0,"bitDepth":1,"legend":{"0":0,"1":1},"cells":[]}"#;
        assert!(matches!(
            SharePayload::decode(&wire(zero)),
            Err(CodecError::MalformedShareCode { .. })
        ));
    }

    #[test]
    fn largest_size_still_decodes() {
        let grid = Grid::new(MAX_GRID_SIZE, BitDepth::Two);
        let payload = SharePayload::new(grid, ValueLegend::identity(BitDepth::Two)).unwrap();
        assert_eq!(SharePayload::decode(&payload.encode()).unwrap(), payload);
    }

    #[test]
    fn extract_code_accepts_url_fragment_and_bare_code() {
        assert_eq!(extract_code("abc"), "abc");
        assert_eq!(extract_code(" #mosaic=abc "), "abc");
        assert_eq!(extract_code("mosaic=abc"), "abc");
        assert_eq!(extract_code("https://example.org/tool/#mosaic=abc"), "abc");
    }

    #[test]
    fn fragment_round_trips() {
        let payload = sample();
        let url = format!("https://example.org/{}", payload.to_fragment());
        assert_eq!(from_fragment(&url), Some(Ok(payload)));
        assert_eq!(from_fragment("#other=1"), None);
    }
}

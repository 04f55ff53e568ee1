/// Bitstream codec: grid cells ↔ a string of `0`/`1` characters.
///
/// Encoding concatenates each cell's code (`bit_codes(depth)[value]`) in
/// row-major order, optionally one line per grid row. Decoding first drops
/// every character that is not `0` or `1` (so row breaks and stray spacing
/// in pasted text are tolerated), checks the exact length, then reads
/// fixed windows of `depth` characters. Window `i` is cell `i`; there is
/// no row/column reinterpretation.

use super::error::{CodecError, Result};
use super::grid::BitDepth;
use super::legend::{bit_codes, Legend, LegendValue, ValueLegend};

/// Keep only `0` and `1`. Lossy: anything else is silently discarded.
pub fn clean_bitstream(raw: &str) -> String {
    raw.chars().filter(|c| matches!(c, '0' | '1')).collect()
}

/// Encode cells. With `break_rows`, each row of `size` codes is its own
/// line and the last line has no trailing newline.
///
/// The caller guarantees `cells.len() == size * size` and that every
/// value is within the depth.
pub fn encode(cells: &[u8], depth: BitDepth, size: usize, break_rows: bool) -> String {
    let codes = bit_codes(depth);
    let codes: Vec<&str> = cells.iter().map(|v| codes[*v as usize]).collect();
    join_codes(&codes, size, break_rows)
}

/// Encode cells through a (possibly non-identity) legend, using the first
/// code that decodes to each value. `None` if some value has no code.
pub fn encode_with(cells: &[u8], size: usize, legend: &ValueLegend, break_rows: bool) -> Option<String> {
    let codes: Option<Vec<&str>> = cells.iter().map(|v| legend.code_for(*v)).collect();
    Some(join_codes(&codes?, size, break_rows))
}

fn join_codes(codes: &[&str], size: usize, break_rows: bool) -> String {
    if !break_rows || size == 0 {
        return codes.concat();
    }
    codes.chunks(size).map(|row| row.concat()).collect::<Vec<_>>().join("\n")
}

/// Number of clean bits a `size`×`size` grid needs at `depth`.
pub fn expected_len(size: usize, depth: BitDepth) -> usize {
    size * size * depth.bits()
}

/// Decode a stream through `legend`.
pub fn decode<T: LegendValue>(
    stream: &str,
    size: usize,
    depth: BitDepth,
    legend: &Legend<T>,
) -> Result<Vec<T>> {
    let clean = clean_bitstream(stream);
    let expected = expected_len(size, depth);
    if clean.len() != expected {
        return Err(CodecError::LengthMismatch { actual: clean.len(), expected });
    }

    // `clean` is pure ASCII, so byte windows are char windows.
    clean
        .as_bytes()
        .chunks(depth.bits())
        .map(|window| {
            let code = std::str::from_utf8(window).unwrap_or_default();
            legend
                .get(code)
                .cloned()
                .ok_or_else(|| CodecError::UnknownCode { code: code.to_string() })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::grid::GRID_SIZES;
    use crate::domain::legend::ValueLegend;
    use proptest::prelude::*;

    #[test]
    fn clean_drops_everything_but_bits() {
        assert_eq!(clean_bitstream("01 10\n2a1\t0"), "011010");
    }

    #[test]
    fn encode_flat_two_bit() {
        assert_eq!(encode(&[0, 1, 2, 3], BitDepth::Two, 2, false), "00011011");
    }

    #[test]
    fn encode_breaks_rows_without_trailing_newline() {
        assert_eq!(encode(&[0, 1, 2, 3], BitDepth::Two, 2, true), "0001\n1011");
        assert_eq!(encode(&[1, 0, 0, 1], BitDepth::One, 2, true), "10\n01");
    }

    #[test]
    fn encode_with_legend_inverts_decode() {
        let legend = ValueLegend::parse("00=3\n01=2\n10=1\n11=0").unwrap();
        let stream = encode_with(&[3, 2, 1, 0], 2, &legend, true).unwrap();
        assert_eq!(stream, "0001\n1011");
        assert_eq!(decode(&stream, 2, BitDepth::Two, &legend).unwrap(), vec![3, 2, 1, 0]);
    }

    #[test]
    fn encode_with_gives_up_on_unreachable_value() {
        let legend = ValueLegend::parse("0=0\n1=0").unwrap();
        assert_eq!(encode_with(&[0, 1], 2, &legend, false), None);
    }

    #[test]
    fn decode_reports_actual_and_expected_length() {
        let legend = ValueLegend::identity(BitDepth::One);
        let err = decode("101", 2, BitDepth::One, &legend).unwrap_err();
        assert_eq!(err, CodecError::LengthMismatch { actual: 3, expected: 4 });
        assert_eq!(err.to_string(), "Bitstream length 3 does not match expected 4.");
    }

    #[test]
    fn decode_counts_only_clean_bits() {
        let legend = ValueLegend::identity(BitDepth::One);
        let values = decode("1 0\n0-1", 2, BitDepth::One, &legend).unwrap();
        assert_eq!(values, vec![1, 0, 0, 1]);
    }

    #[test]
    fn decode_maps_through_non_identity_legend() {
        let legend = ValueLegend::parse("00=3\n01=2\n10=1\n11=0").unwrap();
        let values = decode("00011011", 2, BitDepth::Two, &legend).unwrap();
        assert_eq!(values, vec![3, 2, 1, 0]);
    }

    #[test]
    fn decode_rejects_window_missing_from_legend() {
        let mut map = ValueLegend::identity(BitDepth::Two).as_map().clone();
        map.remove("11");
        let legend = Legend::unchecked(BitDepth::Two, map);
        let err = decode("00 01 10 11", 2, BitDepth::Two, &legend).unwrap_err();
        assert_eq!(err, CodecError::UnknownCode { code: "11".into() });
        assert_eq!(err.to_string(), "Bit pattern 11 is not in the legend.");
    }

    #[test]
    fn decode_checks_length_before_codes() {
        let legend = ValueLegend::identity(BitDepth::One);
        let err = decode("0011", 1, BitDepth::Two, &legend).unwrap_err();
        assert_eq!(err, CodecError::LengthMismatch { actual: 4, expected: 2 });
    }

    fn grid_strategy() -> impl Strategy<Value = (BitDepth, usize, Vec<u8>, bool)> {
        (prop::sample::select(vec![BitDepth::One, BitDepth::Two]), prop::sample::select(GRID_SIZES.to_vec()), any::<bool>())
            .prop_flat_map(|(depth, size, break_rows)| {
                prop::collection::vec(0..=depth.max_value(), size * size)
                    .prop_map(move |cells| (depth, size, cells, break_rows))
            })
    }

    proptest! {
        #[test]
        fn identity_legend_round_trips((depth, size, cells, break_rows) in grid_strategy()) {
            let stream = encode(&cells, depth, size, break_rows);
            let decoded = decode(&stream, size, depth, &ValueLegend::identity(depth)).unwrap();
            prop_assert_eq!(decoded, cells);
        }

        #[test]
        fn row_broken_stream_has_one_line_per_row((depth, size, cells, _b) in grid_strategy()) {
            let stream = encode(&cells, depth, size, true);
            prop_assert_eq!(stream.lines().count(), size);
            prop_assert!(stream.lines().all(|l| l.len() == size * depth.bits()));
        }
    }
}

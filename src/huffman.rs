//! Canonical Huffman tables.
//!
//! A DHT segment carries a histogram of code lengths (how many codes of
//! each length 1..=16 exist) followed by the symbol values in code order.
//! Codes are assigned canonically: counting up within a length, doubling
//! when moving to the next length. That lets decoding work off three small
//! per-length arrays instead of a tree.

use crate::errors::DecodeErrors;

/// Longest code length the format permits.
const MAX_CODE_LENGTH: usize = 16;

/// A canonical Huffman table, either DC or AC class.
#[derive(Clone)]
pub(crate) struct HuffmanTable
{
    /// Smallest code of each length, index 1..=16
    mincode: [i32; MAX_CODE_LENGTH + 1],
    /// Largest code of each length, -1 where the length has no codes
    maxcode: [i32; MAX_CODE_LENGTH + 1],
    /// Index of the first symbol of each length in `values`
    val_ptr: [i32; MAX_CODE_LENGTH + 1],
    /// Symbol values in increasing code order
    values: Vec<u8>,
}

impl HuffmanTable
{
    /// Build a table from the 16-entry length histogram and symbol list of
    /// a DHT segment.
    ///
    /// `counts[i]` is the number of codes of length `i + 1`, the 1-based
    /// wire convention.
    ///
    /// # Errors
    /// When the histogram does not describe a prefix-free code, or a DC
    /// symbol falls outside 0..=15.
    pub fn new(counts: &[u8; 16], values: Vec<u8>, is_dc: bool) -> Result<HuffmanTable, DecodeErrors>
    {
        let total: usize = counts.iter().map(|c| usize::from(*c)).sum();

        if total != values.len()
        {
            return Err(DecodeErrors::SyntaxStatic(
                "DHT symbol count does not match the length histogram",
            ));
        }

        if is_dc && values.iter().any(|v| *v > 15)
        {
            return Err(DecodeErrors::SyntaxStatic(
                "DC Huffman symbol outside the 0..=15 range",
            ));
        }

        let mut table = HuffmanTable {
            mincode: [0; MAX_CODE_LENGTH + 1],
            maxcode: [-1; MAX_CODE_LENGTH + 1],
            val_ptr: [0; MAX_CODE_LENGTH + 1],
            values,
        };

        // Canonical code assignment, Annex C: count up within a length,
        // shift up moving to the next.
        let mut code: i32 = 0;
        let mut k: i32 = 0;

        for length in 1..=MAX_CODE_LENGTH
        {
            let count = i32::from(counts[length - 1]);

            table.val_ptr[length] = k;
            table.mincode[length] = code;

            k += count;
            code += count;

            if count > 0
            {
                table.maxcode[length] = code - 1;

                // more codes than the length can hold means the histogram
                // cannot form a prefix-free code
                if code > (1 << length)
                {
                    return Err(DecodeErrors::SyntaxStatic(
                        "DHT length histogram is not prefix-free",
                    ));
                }
            }

            code <<= 1;
        }

        Ok(table)
    }

    /// Decode one symbol by pulling bits until a code matches.
    ///
    /// # Errors
    /// `BrokenHuffmanCode` when 16 bits accumulate without a match.
    pub fn decode<F>(&self, mut next_bit: F) -> Result<u8, DecodeErrors>
    where
        F: FnMut() -> Result<u8, DecodeErrors>,
    {
        let mut code = i32::from(next_bit()?);
        let mut length = 1;

        while code > self.maxcode[length]
        {
            length += 1;

            if length > MAX_CODE_LENGTH
            {
                return Err(DecodeErrors::BrokenHuffmanCode);
            }

            code = (code << 1) | i32::from(next_bit()?);
        }

        let index = (self.val_ptr[length] + code - self.mincode[length]) as usize;

        self.values
            .get(index)
            .copied()
            .ok_or(DecodeErrors::BrokenHuffmanCode)
    }
}

#[cfg(test)]
mod tests
{
    use super::HuffmanTable;
    use crate::errors::DecodeErrors;

    /// Feed a table a fixed bit string.
    fn bit_feeder(bits: &'static [u8]) -> impl FnMut() -> Result<u8, DecodeErrors>
    {
        let mut pos = 0;
        move || {
            let bit = bits.get(pos).copied().ok_or(DecodeErrors::UnexpectedEof);
            pos += 1;
            bit
        }
    }

    #[test]
    fn canonical_assignment_round_trips()
    {
        // one 1-bit code, two 2-bit codes: 0 -> 7, 10 -> 3, 11 -> 11
        let mut counts = [0_u8; 16];
        counts[0] = 1;
        counts[1] = 2;

        let table = HuffmanTable::new(&counts, vec![7, 3, 11], true).unwrap();

        let mut bits = bit_feeder(&[0, 1, 0, 1, 1, 0]);

        assert_eq!(table.decode(&mut bits).unwrap(), 7);
        assert_eq!(table.decode(&mut bits).unwrap(), 3);
        assert_eq!(table.decode(&mut bits).unwrap(), 11);
        assert_eq!(table.decode(&mut bits).unwrap(), 7);
    }

    #[test]
    fn sixteen_bits_without_a_match_is_broken()
    {
        let mut counts = [0_u8; 16];
        counts[0] = 1;

        let table = HuffmanTable::new(&counts, vec![0], true).unwrap();

        let err = table.decode(bit_feeder(&[1; 17])).unwrap_err();

        assert!(matches!(err, DecodeErrors::BrokenHuffmanCode));
    }

    #[test]
    fn overfull_histogram_is_rejected()
    {
        // three codes of length one cannot exist
        let mut counts = [0_u8; 16];
        counts[0] = 3;

        assert!(HuffmanTable::new(&counts, vec![0, 1, 2], true).is_err());
    }

    #[test]
    fn dc_symbols_above_fifteen_are_rejected()
    {
        let mut counts = [0_u8; 16];
        counts[0] = 1;

        assert!(HuffmanTable::new(&counts, vec![42], true).is_err());
        assert!(HuffmanTable::new(&counts, vec![42], false).is_ok());
    }

    #[test]
    fn histogram_symbol_mismatch_is_rejected()
    {
        let mut counts = [0_u8; 16];
        counts[0] = 2;

        assert!(HuffmanTable::new(&counts, vec![0], true).is_err());
    }
}

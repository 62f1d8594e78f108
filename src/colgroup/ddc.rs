/*
 * Copyright (c) 2025-present Dawid Pawlik
 *
 * For educational use only by employees and students of MIMUW.
 * See LICENSE file for details.
 */

//! Dense dictionary coded column groups.

use super::Dictionary;
use super::header_size;
use crate::bitmap::AnyBitmap;
use serde::Deserialize;
use serde::Serialize;

/// Groups with fewer distinct tuples than this use single byte codes
pub(crate) const NARROW_CODE_LIMIT: usize = 256;

/// Per-row dictionary codes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DdcCodes {
    Narrow(Vec<u8>),
    Wide(Vec<u32>),
}

impl DdcCodes {
    fn get(&self, row: usize) -> usize {
        match self {
            DdcCodes::Narrow(codes) => codes[row] as usize,
            DdcCodes::Wide(codes) => codes[row] as usize,
        }
    }

    fn code_width(num_values: usize) -> usize {
        if num_values < NARROW_CODE_LIMIT { 1 } else { 4 }
    }
}

/// Every row stores one code into the dictionary. Rows missing from the
/// bitmap point at a trailing all-zero tuple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColGroupDdc {
    col_indexes: Vec<usize>,
    num_rows: usize,
    num_values: usize,
    dictionary: Dictionary,
    codes: DdcCodes,
}

impl ColGroupDdc {
    pub fn new(col_indexes: Vec<usize>, num_rows: usize, bitmap: &AnyBitmap) -> Self {
        let num_values = bitmap.num_values();
        let num_columns = col_indexes.len();

        let mut dictionary = Dictionary::from_bitmap(bitmap);
        if bitmap.num_offsets() < num_rows {
            dictionary.push_zero_tuple(num_columns);
        }

        // the zero tuple sits at index num_values, which still fits a narrow code
        let codes = if num_values < NARROW_CODE_LIMIT {
            let mut codes = vec![num_values as u8; num_rows];
            for (idx, offsets) in bitmap.offset_lists().iter().enumerate() {
                for &row in offsets {
                    codes[row as usize] = idx as u8;
                }
            }
            DdcCodes::Narrow(codes)
        } else {
            let mut codes = vec![num_values as u32; num_rows];
            for (idx, offsets) in bitmap.offset_lists().iter().enumerate() {
                for &row in offsets {
                    codes[row as usize] = idx as u32;
                }
            }
            DdcCodes::Wide(codes)
        };

        Self {
            col_indexes,
            num_rows,
            num_values,
            dictionary,
            codes,
        }
    }

    pub fn col_indexes(&self) -> &[usize] {
        &self.col_indexes
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_values(&self) -> usize {
        self.num_values
    }

    pub fn codes(&self) -> &DdcCodes {
        &self.codes
    }

    pub fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        let code = self.codes.get(row);
        self.dictionary.value(code * self.col_indexes.len() + col)
    }

    pub fn size_in_bytes(&self) -> usize {
        header_size(self.col_indexes.len())
            + self.dictionary.size_in_bytes()
            + self.num_rows * DdcCodes::code_width(self.num_values)
    }

    /// Size of a DDC group built from a bitmap with these properties
    pub(crate) fn estimate_size(
        num_rows: usize,
        num_columns: usize,
        num_values: usize,
        has_zero_rows: bool,
        quantized: bool,
    ) -> usize {
        let tuples = num_values + usize::from(has_zero_rows);
        header_size(num_columns)
            + Dictionary::estimate_size(tuples * num_columns, quantized)
            + num_rows * DdcCodes::code_width(num_values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitmap::Bitmap;

    #[test]
    fn test_narrow_codes_with_zero_rows() {
        let bitmap = AnyBitmap::from(Bitmap::new(
            2,
            vec![1.0, 1.0, 2.0, 0.0],
            vec![vec![0, 2], vec![3]],
            1,
        ));
        let group = ColGroupDdc::new(vec![4, 7], 4, &bitmap);

        assert!(matches!(group.codes(), DdcCodes::Narrow(codes) if codes == &vec![0, 2, 0, 1]));
        assert_eq!(group.get(0, 1), 1.0);
        assert_eq!(group.get(1, 0), 0.0);
        assert_eq!(group.get(3, 0), 2.0);
        assert_eq!(
            group.size_in_bytes(),
            ColGroupDdc::estimate_size(4, 2, 2, true, false)
        );
    }

    #[test]
    fn test_wide_codes() {
        let num_rows = 300;
        let values: Vec<f64> = (1..=num_rows).map(|v| v as f64).collect();
        let offsets = (0..num_rows as u32).map(|r| vec![r]).collect();
        let bitmap = AnyBitmap::from(Bitmap::new(1, values, offsets, 0));
        let group = ColGroupDdc::new(vec![0], num_rows, &bitmap);

        assert!(matches!(group.codes(), DdcCodes::Wide(_)));
        assert_eq!(group.get(299, 0), 300.0);
        // no zero rows, so no zero tuple
        assert_eq!(group.dictionary().len(), 300);
    }
}

use std::io::Read;

use super::Result;

// FTDC packs deltas as unsigned LEB128; values above i64::MAX are negative
// deltas in two's-complement disguise.
pub fn read<R: Read>(reader: &mut R) -> Result<i64> {
    Ok(leb128::read::unsigned(reader)? as i64)
}

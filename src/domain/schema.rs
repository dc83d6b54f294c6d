// ============================================================
// Layer 3 - Schema
// ============================================================
// The training schema shipped next to the config file:
//
//   {
//     "SampleFileName": "wafer_31052010_101010.csv",
//     "LengthOfDateStampInFile": 8,
//     "LengthOfTimeStampInFile": 6,
//     "NumberofColumns": 593
//   }
//
// NumberofColumns counts the identifier column, every sensor
// column and the label column. Prediction files carry no label,
// so they are expected to have one column fewer.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(rename = "SampleFileName")]
    pub sample_file_name: String,

    #[serde(rename = "LengthOfDateStampInFile")]
    pub date_stamp_len: usize,

    #[serde(rename = "LengthOfTimeStampInFile")]
    pub time_stamp_len: usize,

    #[serde(rename = "NumberofColumns")]
    pub number_of_columns: usize,
}

impl Schema {
    #[cfg(test)]
    pub fn new(date_stamp_len: usize, time_stamp_len: usize, number_of_columns: usize) -> Self {
        Self {
            sample_file_name: format!(
                "wafer_{}_{}.csv",
                "0".repeat(date_stamp_len),
                "0".repeat(time_stamp_len)
            ),
            date_stamp_len,
            time_stamp_len,
            number_of_columns,
        }
    }

    /// Column count of a labelled training batch.
    pub fn training_columns(&self) -> usize {
        self.number_of_columns
    }

    /// Column count of an unlabelled prediction batch.
    pub fn prediction_columns(&self) -> usize {
        self.number_of_columns.saturating_sub(1)
    }
}

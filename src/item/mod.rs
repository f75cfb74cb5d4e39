/// This module provides the CSV record and row readers and writers.
pub mod csv;

pub mod csv;
pub mod excel;
pub mod raw;

// Re-export commonly used functions
pub use self::csv::{read_csv, read_csv_bytes, to_csv_string, write_csv};
pub use self::excel::{read_excel, read_excel_bytes};
pub use self::raw::RawTable;

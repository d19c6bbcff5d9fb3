use comfy_table::{Cell, Table};

use crate::error::Result;
use crate::platforms::ALL_PLATFORMS;

pub fn list() -> Result<()> {
    let mut table = Table::new();
    table.set_header(vec!["Key", "Platform", "Export file", "Kept if filled by", "Overall grade weights"]);
    for platform in ALL_PLATFORMS {
        let threshold = platform.threshold();
        let weights = platform
            .weights()
            .iter()
            .map(|(category, weight)| format!("{} {weight}%", category.name()))
            .collect::<Vec<_>>()
            .join(", ");
        table.add_row(vec![
            Cell::new(platform.key()),
            Cell::new(platform.name()),
            Cell::new(platform.glob()),
            Cell::new(format!("{}/{} of students", threshold.numerator, threshold.denominator)),
            Cell::new(weights),
        ]);
    }
    println!("Platforms\n{table}");
    Ok(())
}

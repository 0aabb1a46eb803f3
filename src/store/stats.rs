use rustc_hash::FxHashSet;
use serde::Serialize;

/// Summary of the current store contents
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub generation: u64,
    pub records: usize,
    pub distinct_names: usize,
    pub shortest_name: usize,
    pub longest_name: usize,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl StoreStats {
    /// Build from names in store order
    pub(crate) fn from_names<'a>(generation: u64, names: impl Iterator<Item = &'a str>) -> Self {
        let mut stats = Self {
            generation,
            ..Default::default()
        };
        let mut distinct = FxHashSet::default();

        for name in names {
            if stats.records == 0 {
                stats.first_name = Some(name.to_string());
                stats.shortest_name = name.chars().count();
            }
            let len = name.chars().count();
            stats.shortest_name = stats.shortest_name.min(len);
            stats.longest_name = stats.longest_name.max(len);
            stats.last_name = Some(name.to_string());
            stats.records += 1;
            distinct.insert(name);
        }

        stats.distinct_names = distinct.len();
        stats
    }
}

/// Print store statistics in the CLI's report format
pub fn show_stats(stats: &StoreStats) {
    println!("Store Statistics");
    println!("================");
    println!();
    println!("Generation:       {}", stats.generation);
    println!("Records:          {}", stats.records);
    println!("Distinct names:   {}", stats.distinct_names);
    println!(
        "Name length:      {}..={} chars",
        stats.shortest_name, stats.longest_name
    );
    if let (Some(first), Some(last)) = (&stats.first_name, &stats.last_name) {
        println!("First name:       {}", first);
        println!("Last name:        {}", last);
    }
}

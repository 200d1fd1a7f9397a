//! Built-in fallback dataset.
//!
//! Served verbatim whenever live retrieval fails. The labels and values are
//! a golden fixture: exports produced from fallback data must stay
//! byte-for-byte compatible with earlier releases, so do not reformat them.
//!
//! The same labels double as the metric catalog requested from the provider.

use super::{Category, StatRecord};

/// Number of entries in the fallback dataset.
pub const FALLBACK_LEN: usize = 63;

const FALLBACK: [(&str, &str, Category); FALLBACK_LEN] = [
    ("Current World Population", "8,100,000,000+", Category::Population),
    ("Births this year", "30,000,000+", Category::Population),
    ("Births today", "250,000+", Category::Population),
    ("Deaths this year", "15,000,000+", Category::Population),
    ("Deaths today", "140,000+", Category::Population),
    ("Net population growth this year", "15,000,000+", Category::Population),
    ("Net population growth today", "110,000+", Category::Population),

    ("Public Healthcare expenditure today", "$18,000,000,000+", Category::GovernmentEconomics),
    ("Public Education expenditure today", "$14,000,000,000+", Category::GovernmentEconomics),
    ("Public Military expenditure today", "$5,000,000,000+", Category::GovernmentEconomics),
    ("Cars produced this year", "16,000,000+", Category::GovernmentEconomics),
    ("Bicycles produced this year", "30,000,000+", Category::GovernmentEconomics),
    ("Computers produced this year", "50,000,000+", Category::GovernmentEconomics),

    ("New book titles published this year", "600,000+", Category::SocietyMedia),
    ("Newspapers circulated today", "90,000,000+", Category::SocietyMedia),
    ("TV sets sold worldwide today", "150,000+", Category::SocietyMedia),
    ("Cellular phones sold today", "1,500,000+", Category::SocietyMedia),
    ("Money spent on videogames today", "$300,000,000+", Category::SocietyMedia),
    ("Internet users in the world today", "5,300,000,000+", Category::SocietyMedia),
    ("Emails sent today", "200,000,000,000+", Category::SocietyMedia),
    ("Blog posts written today", "4,000,000+", Category::SocietyMedia),
    ("Tweets sent today", "600,000,000+", Category::SocietyMedia),
    ("Google searches today", "8,500,000,000+", Category::SocietyMedia),

    ("Forest loss this year (hectares)", "1,500,000+", Category::Environment),
    ("Land lost to soil erosion this year (ha)", "2,000,000+", Category::Environment),
    ("CO2 emissions this year (tons)", "10,000,000,000+", Category::Environment),
    ("Desertification this year (hectares)", "3,000,000+", Category::Environment),
    ("Toxic chemicals released in the environment this year (tons)", "2,500,000+", Category::Environment),

    ("Undernourished people in the world", "850,000,000+", Category::Food),
    ("Overweight people in the world", "1,700,000,000+", Category::Food),
    ("Obese people in the world", "800,000,000+", Category::Food),
    ("People who died of hunger today", "20,000+", Category::Food),
    ("Money spent for obesity related diseases in the USA today", "$400,000,000+", Category::Food),
    ("Money spent on weight loss programs in the USA today", "$100,000,000+", Category::Food),

    ("Water used this year (million L)", "1,000,000,000+", Category::Water),
    ("Deaths caused by water related diseases this year", "200,000+", Category::Water),
    ("People with no access to a safe drinking water source", "700,000,000+", Category::Water),

    ("Energy used today (MWh)", "350,000,000+", Category::Energy),
    ("Energy used today from non-renewable sources (MWh)", "280,000,000+", Category::Energy),
    ("Energy used today from renewable sources (MWh)", "70,000,000+", Category::Energy),
    ("Solar energy striking Earth today (MWh)", "400,000,000,000+", Category::Energy),
    ("Oil pumped today (barrels)", "80,000,000+", Category::Energy),
    ("Oil left (barrels)", "1,500,000,000,000", Category::Energy),
    ("Days to the end of oil", "~40 years", Category::Energy),
    ("Natural Gas left (boe)", "1,100,000,000,000", Category::Energy),
    ("Days to the end of natural gas", "~150 years", Category::Energy),
    ("Coal left (boe)", "4,000,000,000,000", Category::Energy),
    ("Days to the end of coal", "~400 years", Category::Energy),

    ("Communicable disease deaths this year", "4,000,000+", Category::Health),
    ("Seasonal flu deaths this year", "150,000+", Category::Health),
    ("Deaths of children under 5 this year", "2,000,000+", Category::Health),
    ("Abortions this year", "12,000,000+", Category::Health),
    ("Deaths of mothers during birth this year", "90,000+", Category::Health),
    ("HIV/AIDS infected people", "40,000,000+", Category::Health),
    ("Deaths caused by HIV/AIDS this year", "500,000+", Category::Health),
    ("Deaths caused by cancer this year", "2,500,000+", Category::Health),
    ("Deaths caused by malaria this year", "300,000+", Category::Health),
    ("Cigarettes smoked today", "10,000,000,000+", Category::Health),
    ("Deaths caused by smoking this year", "1,500,000+", Category::Health),
    ("Deaths caused by alcohol this year", "800,000+", Category::Health),
    ("Suicides this year", "300,000+", Category::Health),
    ("Money spent on illegal drugs this year", "$100,000,000,000+", Category::Health),
    ("Road traffic accident fatalities this year", "400,000+", Category::Health),
];

/// A fresh copy of the fallback dataset, in dashboard order.
pub fn dataset() -> Vec<StatRecord> {
    FALLBACK
        .iter()
        .map(|&(label, value, category)| StatRecord::new(label, value, category))
        .collect()
}

/// Metric labels the provider must return, grouped by category in prompt order.
pub fn catalog() -> Vec<(Category, Vec<&'static str>)> {
    Category::FIXED
        .into_iter()
        .map(|cat| {
            let labels = FALLBACK
                .iter()
                .filter(|(_, _, c)| *c == cat)
                .map(|(label, _, _)| *label)
                .collect();
            (cat, labels)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn dataset_has_63_entries() {
        assert_eq!(dataset().len(), 63);
    }

    #[test]
    fn dataset_spans_all_fixed_categories() {
        let present: HashSet<Category> = dataset().iter().map(|r| r.category).collect();
        for cat in Category::FIXED {
            assert!(present.contains(&cat), "missing {cat}");
        }
        assert!(!present.contains(&Category::Other));
    }

    #[test]
    fn labels_are_unique() {
        let labels: HashSet<String> = dataset().into_iter().map(|r| r.label).collect();
        assert_eq!(labels.len(), FALLBACK_LEN);
    }

    #[test]
    fn golden_entries_are_verbatim() {
        let data = dataset();
        assert_eq!(
            data[0],
            StatRecord::new("Current World Population", "8,100,000,000+", Category::Population)
        );
        let oil = data.iter().find(|r| r.label == "Days to the end of oil").unwrap();
        assert_eq!(oil.value, "~40 years");
        assert_eq!(
            data.last().unwrap().label,
            "Road traffic accident fatalities this year"
        );
    }

    #[test]
    fn catalog_groups_every_label_once() {
        let catalog = catalog();
        assert_eq!(catalog.len(), 8);
        let total: usize = catalog.iter().map(|(_, labels)| labels.len()).sum();
        assert_eq!(total, FALLBACK_LEN);
        assert_eq!(catalog[0].0, Category::Population);
        assert_eq!(catalog[0].1.len(), 7);
        assert_eq!(catalog[7].1.len(), 15);
    }
}

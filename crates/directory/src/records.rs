use serde::{Deserialize, Serialize};

/// A row of the `students` table. Dates are kept as the strings the database
/// exports.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Student {
    pub id: i64,
    pub census_record_1900: Option<String>,
    pub indian_name: Option<String>,
    pub family_name: Option<String>,
    pub english_given_name: Option<String>,
    pub alias: Option<String>,
    pub sex: Option<String>,
    pub year_of_birth: Option<i32>,
    pub year_of_birth_uncertain: Option<bool>,
    pub year_of_birth_uncertainty_type: Option<String>,
    pub year_of_birth_original_text: Option<String>,
    pub arrival_at_lincoln: Option<String>,
    pub arrival_at_lincoln_uncertain: Option<bool>,
    pub arrival_at_lincoln_uncertainty_type: Option<String>,
    pub arrival_at_lincoln_original_text: Option<String>,
    pub departure_from_lincoln: Option<String>,
    pub departure_from_lincoln_uncertain: Option<bool>,
    pub departure_from_lincoln_uncertainty_type: Option<String>,
    pub departure_from_lincoln_original_text: Option<String>,
    pub nation: Option<String>,
    pub band: Option<String>,
    pub agency: Option<String>,
    pub trade: Option<String>,
    pub source: Option<String>,
    pub comments: Option<String>,
    pub cause_of_death: Option<String>,
    pub cemetery_burial: Option<String>,
    pub relevant_links: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

/// A row of the `civil_war_orphans` table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CivilWarOrphan {
    pub id: i64,
    pub family_name: Option<String>,
    pub given_name: Option<String>,
    pub aliases: Option<String>,
    pub birth_date: Option<String>,
    pub arrival: Option<String>,
    pub departure: Option<String>,
    pub scholarships: Option<String>,
    pub assignments: Option<String>,
    pub situation_1878: Option<String>,
    pub assignment_scholarship_year: Option<String>,
    pub references: Option<String>,
    pub comments: Option<String>,
    pub birth_date_original_text: Option<String>,
    pub birth_date_uncertain: Option<String>,
    pub birth_date_clean: Option<String>,
    pub arrival_original_text: Option<String>,
    pub arrival_uncertain: Option<String>,
    pub arrival_at_lincoln: Option<String>,
    pub departure_original_text: Option<String>,
    pub departure_uncertain: Option<String>,
    pub departure_at_lincoln: Option<String>,
    pub departure_from_lincoln: Option<String>,
}

/// Fields a free-text search looks at.
pub(crate) trait Searchable {
    fn search_fields(&self) -> Vec<&str>;
}

impl Searchable for Student {
    fn search_fields(&self) -> Vec<&str> {
        [
            &self.family_name,
            &self.english_given_name,
            &self.indian_name,
            &self.alias,
            &self.nation,
            &self.band,
        ]
        .into_iter()
        .filter_map(|f| f.as_deref())
        .collect()
    }
}

impl Searchable for CivilWarOrphan {
    fn search_fields(&self) -> Vec<&str> {
        [&self.family_name, &self.given_name, &self.aliases]
            .into_iter()
            .filter_map(|f| f.as_deref())
            .collect()
    }
}

//! Raw study records to snapshot CSVs

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

use super::model::Study;
use super::normalize::{age_to_months, clean_text, format_float, join, standardize_date, title_case};

pub const UTF8_BOM: &str = "\u{feff}";

pub const STUDY_COLUMNS: [&str; 33] = [
    "NCTId",
    "BriefTitle",
    "Acronym",
    "OverallStatus",
    "BriefSummary",
    "HasResults",
    "Condition",
    "InterventionType",
    "InterventionName",
    "PrimaryOutcomeMeasure",
    "SecondaryOutcomeMeasure",
    "LeadSponsorName",
    "CollaboratorName",
    "Sex",
    "MinimumAge",
    "MaximumAge",
    "MinimumAgeMonths",
    "MaximumAgeMonths",
    "StdAge",
    "Phase",
    "EnrollmentCount",
    "LeadSponsorClass",
    "StudyType",
    "DesignPrimaryPurpose",
    "OrgStudyId",
    "SecondaryId",
    "StartDate",
    "PrimaryCompletionDate",
    "CompletionDate",
    "StudyFirstPostDate",
    "ResultsFirstPostDate",
    "LastUpdatePostDate",
    "Timestamp",
];

/// Columns holding `YYYY-MM-DD` dates
pub const DATE_COLUMNS: [&str; 6] = [
    "StartDate",
    "PrimaryCompletionDate",
    "CompletionDate",
    "StudyFirstPostDate",
    "ResultsFirstPostDate",
    "LastUpdatePostDate",
];

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct StudyRow {
    #[serde(rename = "NCTId")]
    pub nct_id: String,
    pub brief_title: String,
    pub acronym: String,
    pub overall_status: String,
    pub brief_summary: String,
    pub has_results: String,
    pub condition: String,
    pub intervention_type: String,
    pub intervention_name: String,
    pub primary_outcome_measure: String,
    pub secondary_outcome_measure: String,
    pub lead_sponsor_name: String,
    pub collaborator_name: String,
    pub sex: String,
    pub minimum_age: String,
    pub maximum_age: String,
    pub minimum_age_months: String,
    pub maximum_age_months: String,
    pub std_age: String,
    pub phase: String,
    pub enrollment_count: String,
    pub lead_sponsor_class: String,
    pub study_type: String,
    pub design_primary_purpose: String,
    pub org_study_id: String,
    pub secondary_id: String,
    pub start_date: String,
    pub primary_completion_date: String,
    pub completion_date: String,
    pub study_first_post_date: String,
    pub results_first_post_date: String,
    pub last_update_post_date: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConditionRow {
    #[serde(rename = "NCTId")]
    pub nct_id: String,
    pub condition: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LocationRow {
    #[serde(rename = "NCTId")]
    pub nct_id: String,
    pub facility: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub zip: String,
    pub status: String,
    pub recruitment_status: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct InterventionRow {
    #[serde(rename = "NCTId")]
    pub nct_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub description: String,
    pub arm_group_labels: String,
    pub other_names: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SponsorRow {
    #[serde(rename = "NCTId")]
    pub nct_id: String,
    #[serde(rename = "Sponsor")]
    pub sponsor: String,
    #[serde(rename = "SponsorClass")]
    pub sponsor_class: String,
    #[serde(rename = "Collaborator")]
    pub collaborator: String,
    #[serde(rename = "CollaboratorClass")]
    pub collaborator_class: String,
}

const CONDITION_COLUMNS: [&str; 2] = ["NCTId", "condition"];
const LOCATION_COLUMNS: [&str; 8] = [
    "NCTId",
    "facility",
    "city",
    "state",
    "country",
    "zip",
    "status",
    "recruitment_status",
];
const INTERVENTION_COLUMNS: [&str; 6] = [
    "NCTId",
    "type",
    "name",
    "description",
    "arm_group_labels",
    "other_names",
];
const SPONSOR_COLUMNS: [&str; 5] = [
    "NCTId",
    "Sponsor",
    "SponsorClass",
    "Collaborator",
    "CollaboratorClass",
];

/// All tables derived from one download
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub studies: Vec<StudyRow>,
    pub conditions: Vec<ConditionRow>,
    pub locations: Vec<LocationRow>,
    pub interventions: Vec<InterventionRow>,
    pub sponsors: Vec<SponsorRow>,
}

impl Snapshot {
    /// Flatten studies into rows; every study row shares `timestamp`
    pub fn build(studies: &[Study], timestamp: &str) -> Self {
        let mut snapshot = Snapshot::default();
        for study in studies {
            snapshot.add_study(study, timestamp);
        }
        snapshot
    }

    fn add_study(&mut self, study: &Study, timestamp: &str) {
        let protocol = &study.protocol_section;
        let ident = &protocol.identification_module;
        let status = &protocol.status_module;
        let sponsors = &protocol.sponsor_collaborators_module;
        let outcomes = &protocol.outcomes_module;
        let interventions = &protocol.arms_interventions_module.interventions;
        let eligibility = &protocol.eligibility_module;
        let design = &protocol.design_module;
        let nct_id = study.nct_id().to_string();
        let lead = sponsors.lead_sponsor.clone().unwrap_or_default();

        self.studies.push(StudyRow {
            nct_id: nct_id.clone(),
            brief_title: clean_text(&ident.brief_title),
            acronym: clean_text(&ident.acronym),
            overall_status: title_case(&status.overall_status),
            brief_summary: clean_text(&protocol.description_module.brief_summary),
            has_results: match study.has_results {
                Some(true) => "True".to_string(),
                Some(false) => "False".to_string(),
                None => String::new(),
            },
            condition: clean_text(&join(&protocol.conditions_module.conditions)),
            intervention_type: clean_text(&join(interventions.iter().map(|i| title_case(&i.kind)))),
            intervention_name: clean_text(&join(interventions.iter().map(|i| &i.name))),
            primary_outcome_measure: clean_text(&join(outcomes.primary_outcomes.iter().map(|o| &o.measure))),
            secondary_outcome_measure: clean_text(&join(
                outcomes.secondary_outcomes.iter().map(|o| &o.measure),
            )),
            lead_sponsor_name: clean_text(&lead.name),
            collaborator_name: clean_text(&join(sponsors.collaborators.iter().map(|c| &c.name))),
            sex: title_case(&eligibility.sex),
            minimum_age: eligibility.minimum_age.clone(),
            maximum_age: eligibility.maximum_age.clone(),
            minimum_age_months: format_float(age_to_months(&eligibility.minimum_age)),
            maximum_age_months: format_float(age_to_months(&eligibility.maximum_age)),
            std_age: join(eligibility.std_ages.iter().map(|a| title_case(a))),
            phase: join(design.phases.iter().map(|p| title_case(p))),
            enrollment_count: design
                .enrollment_info
                .count
                .map(|c| c.to_string())
                .unwrap_or_default(),
            lead_sponsor_class: title_case(&lead.class),
            study_type: title_case(&design.study_type),
            design_primary_purpose: title_case(&design.design_info.primary_purpose),
            org_study_id: ident.org_study_id_info.id.clone(),
            secondary_id: clean_text(&join(ident.secondary_id_infos.iter().map(|s| &s.id))),
            start_date: standardize_date(&status.start_date_struct.date),
            primary_completion_date: standardize_date(&status.primary_completion_date_struct.date),
            completion_date: standardize_date(&status.completion_date_struct.date),
            study_first_post_date: standardize_date(&status.study_first_post_date_struct.date),
            results_first_post_date: standardize_date(&status.results_first_post_date_struct.date),
            last_update_post_date: standardize_date(&status.last_update_post_date_struct.date),
            timestamp: timestamp.to_string(),
        });

        for condition in &protocol.conditions_module.conditions {
            self.conditions.push(ConditionRow {
                nct_id: nct_id.clone(),
                condition: condition.trim().to_string(),
            });
        }

        for location in &protocol.contacts_locations_module.locations {
            self.locations.push(LocationRow {
                nct_id: nct_id.clone(),
                facility: clean_text(&location.facility),
                city: clean_text(&location.city),
                state: clean_text(&location.state),
                country: clean_text(&location.country),
                zip: clean_text(&location.zip),
                status: title_case(&location.status),
                recruitment_status: title_case(&location.recruitment_status),
            });
        }

        for intervention in interventions {
            self.interventions.push(InterventionRow {
                nct_id: nct_id.clone(),
                kind: title_case(&intervention.kind),
                name: clean_text(&intervention.name),
                description: clean_text(&intervention.description),
                arm_group_labels: clean_text(&join(&intervention.arm_group_labels)),
                other_names: clean_text(&join(&intervention.other_names)),
            });
        }

        if let Some(lead) = &sponsors.lead_sponsor {
            let sponsor = clean_text(&lead.name);
            let sponsor_class = title_case(&lead.class);
            if sponsors.collaborators.is_empty() {
                self.sponsors.push(SponsorRow {
                    nct_id: nct_id.clone(),
                    sponsor,
                    sponsor_class,
                    collaborator: String::new(),
                    collaborator_class: String::new(),
                });
            } else {
                for collaborator in &sponsors.collaborators {
                    self.sponsors.push(SponsorRow {
                        nct_id: nct_id.clone(),
                        sponsor: sponsor.clone(),
                        sponsor_class: sponsor_class.clone(),
                        collaborator: clean_text(&collaborator.name),
                        collaborator_class: title_case(&collaborator.class),
                    });
                }
            }
        }
    }

    /// Write every table into `data_dir`
    pub fn write_all(&self, data_dir: &Path) -> Result<()> {
        write_csv(&data_dir.join("studies.csv"), &STUDY_COLUMNS, &self.studies)?;
        info!(rows = self.studies.len(), "Wrote studies.csv");
        write_csv(&data_dir.join("conditions.csv"), &CONDITION_COLUMNS, &self.conditions)?;
        info!(rows = self.conditions.len(), "Wrote conditions.csv");
        write_csv(&data_dir.join("locations.csv"), &LOCATION_COLUMNS, &self.locations)?;
        info!(rows = self.locations.len(), "Wrote locations.csv");
        write_csv(&data_dir.join("interventions.csv"), &INTERVENTION_COLUMNS, &self.interventions)?;
        info!(rows = self.interventions.len(), "Wrote interventions.csv");
        write_csv(&data_dir.join("sponsors_collaborators.csv"), &SPONSOR_COLUMNS, &self.sponsors)?;
        info!(rows = self.sponsors.len(), "Wrote sponsors_collaborators.csv");
        Ok(())
    }
}

/// Parse raw API records; a record that does not fit the model is an error
pub fn parse_studies(raw: &[serde_json::Value]) -> Result<Vec<Study>> {
    raw.iter()
        .enumerate()
        .map(|(i, value)| {
            serde_json::from_value(value.clone()).with_context(|| format!("Study record {i} is malformed"))
        })
        .collect()
}

/// Write the raw records as pretty JSON
pub fn write_raw_studies(path: &Path, raw: &[serde_json::Value]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Cannot create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, raw)?;
    writer.flush()?;
    Ok(())
}

/// Write a BOM-prefixed CSV. The header is written even when `rows` is empty.
pub fn write_csv<T: Serialize>(path: &Path, headers: &[&str], rows: &[T]) -> Result<()> {
    let mut file = BufWriter::new(File::create(path).with_context(|| format!("Cannot create {}", path.display()))?);
    file.write_all(UTF8_BOM.as_bytes())?;

    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
    writer.write_record(headers)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_study() -> Study {
        serde_json::from_value(serde_json::json!({
            "protocolSection": {
                "identificationModule": {
                    "nctId": "NCT01234567",
                    "briefTitle": "Empagliflozin in HFpEF &amp; Diabetes",
                    "orgStudyIdInfo": {"id": "ORG-1"},
                    "secondaryIdInfos": [{"id": "S1"}, {"id": "S2"}]
                },
                "statusModule": {
                    "overallStatus": "NOT_YET_RECRUITING",
                    "startDateStruct": {"date": "2024-03"},
                    "completionDateStruct": {"date": "2026-11-30"}
                },
                "sponsorCollaboratorsModule": {
                    "leadSponsor": {"name": "Acme Pharma", "class": "INDUSTRY"},
                    "collaborators": [
                        {"name": "University A", "class": "OTHER"},
                        {"name": "Hospital B", "class": "OTHER"}
                    ]
                },
                "armsInterventionsModule": {
                    "interventions": [
                        {"type": "DRUG", "name": "Empagliflozin", "armGroupLabels": ["Active"]},
                        {"type": "DRUG", "name": "Placebo"}
                    ]
                },
                "eligibilityModule": {
                    "sex": "ALL",
                    "minimumAge": "18 Years",
                    "stdAges": ["ADULT", "OLDER_ADULT"]
                },
                "conditionsModule": {"conditions": [" HFpEF ", "Diabetes"]},
                "designModule": {
                    "studyType": "INTERVENTIONAL",
                    "phases": ["PHASE3"],
                    "enrollmentInfo": {"count": 420},
                    "designInfo": {"primaryPurpose": "TREATMENT"}
                },
                "contactsLocationsModule": {
                    "locations": [{"facility": "Site 1", "city": "Boston", "country": "United States", "status": "RECRUITING"}]
                }
            },
            "hasResults": false
        }))
        .unwrap()
    }

    #[test]
    fn test_study_row_normalisation() {
        let snapshot = Snapshot::build(&[sample_study()], "2026-01-01T00:00:00.000000");
        let row = &snapshot.studies[0];

        assert_eq!(row.brief_title, "Empagliflozin in HFpEF & Diabetes");
        assert_eq!(row.overall_status, "Not Yet Recruiting");
        assert_eq!(row.has_results, "False");
        assert_eq!(row.condition, "HFpEF, Diabetes");
        assert_eq!(row.intervention_type, "Drug, Drug");
        assert_eq!(row.intervention_name, "Empagliflozin, Placebo");
        assert_eq!(row.collaborator_name, "University A, Hospital B");
        assert_eq!(row.minimum_age_months, "216.0");
        assert_eq!(row.maximum_age_months, "0.0");
        assert_eq!(row.std_age, "Adult, Older Adult");
        assert_eq!(row.phase, "Phase3");
        assert_eq!(row.enrollment_count, "420");
        assert_eq!(row.lead_sponsor_class, "Industry");
        assert_eq!(row.secondary_id, "S1, S2");
        assert_eq!(row.start_date, "2024-03-01");
        assert_eq!(row.completion_date, "2026-11-30");
        assert_eq!(row.results_first_post_date, "");
    }

    #[test]
    fn test_child_tables() {
        let snapshot = Snapshot::build(&[sample_study()], "ts");

        assert_eq!(snapshot.conditions.len(), 2);
        assert_eq!(snapshot.conditions[0].condition, "HFpEF");
        assert_eq!(snapshot.locations[0].status, "Recruiting");
        assert_eq!(snapshot.interventions.len(), 2);
        assert_eq!(snapshot.interventions[0].arm_group_labels, "Active");
        assert_eq!(snapshot.sponsors.len(), 2);
        assert_eq!(snapshot.sponsors[1].collaborator, "Hospital B");
    }

    #[test]
    fn test_lead_sponsor_without_collaborators_gets_one_row() {
        let mut study = sample_study();
        study.protocol_section.sponsor_collaborators_module.collaborators.clear();
        let snapshot = Snapshot::build(&[study], "ts");
        assert_eq!(snapshot.sponsors.len(), 1);
        assert_eq!(snapshot.sponsors[0].collaborator, "");
    }

    #[test]
    fn test_write_all_produces_bom_and_headers() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = Snapshot::build(&[sample_study()], "ts");
        snapshot.write_all(dir.path()).unwrap();

        let studies = std::fs::read_to_string(dir.path().join("studies.csv")).unwrap();
        assert!(studies.starts_with("\u{feff}NCTId,BriefTitle,"));
        assert!(studies.contains("NCT01234567"));

        let empty = Snapshot::default();
        empty.write_all(dir.path()).unwrap();
        let interventions = std::fs::read_to_string(dir.path().join("interventions.csv")).unwrap();
        assert_eq!(interventions.trim_end(), "\u{feff}NCTId,type,name,description,arm_group_labels,other_names");
    }
}

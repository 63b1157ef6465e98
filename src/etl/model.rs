//! Typed view of the ClinicalTrials.gov v2 study record
//!
//! Only the modules the snapshot CSVs read are modelled; every field is
//! optional because the API omits empty sections.

use serde::{Deserialize, Deserializer};

/// The API sends `null` for some empty fields; read those as the default
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Study {
    #[serde(deserialize_with = "null_as_default")]
    pub protocol_section: ProtocolSection,
    pub has_results: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProtocolSection {
    #[serde(deserialize_with = "null_as_default")]
    pub identification_module: IdentificationModule,
    #[serde(deserialize_with = "null_as_default")]
    pub status_module: StatusModule,
    #[serde(deserialize_with = "null_as_default")]
    pub sponsor_collaborators_module: SponsorCollaboratorsModule,
    #[serde(deserialize_with = "null_as_default")]
    pub outcomes_module: OutcomesModule,
    #[serde(deserialize_with = "null_as_default")]
    pub arms_interventions_module: ArmsInterventionsModule,
    #[serde(deserialize_with = "null_as_default")]
    pub eligibility_module: EligibilityModule,
    #[serde(deserialize_with = "null_as_default")]
    pub conditions_module: ConditionsModule,
    #[serde(deserialize_with = "null_as_default")]
    pub design_module: DesignModule,
    #[serde(deserialize_with = "null_as_default")]
    pub description_module: DescriptionModule,
    #[serde(deserialize_with = "null_as_default")]
    pub contacts_locations_module: ContactsLocationsModule,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IdentificationModule {
    #[serde(deserialize_with = "null_as_default")]
    pub nct_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub brief_title: String,
    #[serde(deserialize_with = "null_as_default")]
    pub acronym: String,
    #[serde(deserialize_with = "null_as_default")]
    pub org_study_id_info: IdInfo,
    #[serde(deserialize_with = "null_as_default")]
    pub secondary_id_infos: Vec<IdInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IdInfo {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StatusModule {
    #[serde(deserialize_with = "null_as_default")]
    pub overall_status: String,
    #[serde(deserialize_with = "null_as_default")]
    pub start_date_struct: DateStruct,
    #[serde(deserialize_with = "null_as_default")]
    pub primary_completion_date_struct: DateStruct,
    #[serde(deserialize_with = "null_as_default")]
    pub completion_date_struct: DateStruct,
    #[serde(deserialize_with = "null_as_default")]
    pub study_first_post_date_struct: DateStruct,
    #[serde(deserialize_with = "null_as_default")]
    pub results_first_post_date_struct: DateStruct,
    #[serde(deserialize_with = "null_as_default")]
    pub last_update_post_date_struct: DateStruct,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DateStruct {
    #[serde(deserialize_with = "null_as_default")]
    pub date: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SponsorCollaboratorsModule {
    pub lead_sponsor: Option<Organization>,
    #[serde(deserialize_with = "null_as_default")]
    pub collaborators: Vec<Organization>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Organization {
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub class: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OutcomesModule {
    #[serde(deserialize_with = "null_as_default")]
    pub primary_outcomes: Vec<Outcome>,
    #[serde(deserialize_with = "null_as_default")]
    pub secondary_outcomes: Vec<Outcome>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Outcome {
    #[serde(deserialize_with = "null_as_default")]
    pub measure: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ArmsInterventionsModule {
    #[serde(deserialize_with = "null_as_default")]
    pub interventions: Vec<Intervention>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Intervention {
    #[serde(rename = "type")]
    #[serde(deserialize_with = "null_as_default")]
    pub kind: String,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(deserialize_with = "null_as_default")]
    pub arm_group_labels: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub other_names: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EligibilityModule {
    #[serde(deserialize_with = "null_as_default")]
    pub sex: String,
    #[serde(deserialize_with = "null_as_default")]
    pub minimum_age: String,
    #[serde(deserialize_with = "null_as_default")]
    pub maximum_age: String,
    #[serde(deserialize_with = "null_as_default")]
    pub std_ages: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConditionsModule {
    #[serde(deserialize_with = "null_as_default")]
    pub conditions: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DesignModule {
    #[serde(deserialize_with = "null_as_default")]
    pub study_type: String,
    #[serde(deserialize_with = "null_as_default")]
    pub phases: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub enrollment_info: EnrollmentInfo,
    #[serde(deserialize_with = "null_as_default")]
    pub design_info: DesignInfo,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EnrollmentInfo {
    pub count: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DesignInfo {
    #[serde(deserialize_with = "null_as_default")]
    pub primary_purpose: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DescriptionModule {
    #[serde(deserialize_with = "null_as_default")]
    pub brief_summary: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ContactsLocationsModule {
    #[serde(deserialize_with = "null_as_default")]
    pub locations: Vec<Location>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Location {
    #[serde(deserialize_with = "null_as_default")]
    pub facility: String,
    #[serde(deserialize_with = "null_as_default")]
    pub city: String,
    #[serde(deserialize_with = "null_as_default")]
    pub state: String,
    #[serde(deserialize_with = "null_as_default")]
    pub country: String,
    #[serde(deserialize_with = "null_as_default")]
    pub zip: String,
    #[serde(deserialize_with = "null_as_default")]
    pub status: String,
    #[serde(deserialize_with = "null_as_default")]
    pub recruitment_status: String,
}

impl Study {
    pub fn nct_id(&self) -> &str {
        &self.protocol_section.identification_module.nct_id
    }
}

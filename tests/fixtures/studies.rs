//! ClinicalTrials.gov v2 records for the native ETL tests
#![allow(dead_code)]

use serde_json::{json, Value};

pub fn study(nct_id: &str, status: &str, enrollment: u64) -> Value {
    json!({
        "protocolSection": {
            "identificationModule": {
                "nctId": nct_id,
                "briefTitle": "Exercise Training in HFpEF &amp; Obesity",
                "acronym": "EX-HF",
                "orgStudyIdInfo": {"id": format!("ORG-{nct_id}")}
            },
            "statusModule": {
                "overallStatus": status,
                "startDateStruct": {"date": "2021-03"},
                "completionDateStruct": {"date": "2025-12-31"}
            },
            "sponsorCollaboratorsModule": {
                "leadSponsor": {"name": "Duke University", "class": "OTHER"},
                "collaborators": [{"name": "National Heart, Lung, and Blood Institute", "class": "NIH"}]
            },
            "conditionsModule": {"conditions": ["HFpEF", "Obesity"]},
            "designModule": {
                "studyType": "INTERVENTIONAL",
                "phases": ["PHASE2"],
                "enrollmentInfo": {"count": enrollment}
            },
            "eligibilityModule": {"sex": "ALL", "minimumAge": "18 Years", "maximumAge": "85 Years"},
            "armsInterventionsModule": {
                "interventions": [{"type": "BEHAVIORAL", "name": "Supervised exercise"}]
            },
            "contactsLocationsModule": {
                "locations": [{"facility": "Duke Clinic", "city": "Durham", "state": "North Carolina", "country": "United States"}]
            }
        },
        "hasResults": false
    })
}

pub fn page(studies: Vec<Value>, next: Option<&str>) -> Value {
    match next {
        Some(token) => json!({"studies": studies, "nextPageToken": token}),
        None => json!({"studies": studies}),
    }
}

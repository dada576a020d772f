//! Member profiles.
//!
//! Credentials live with the auth provider; this is the directory row the
//! club manages. The core only needs id/full_name/member_no for display
//! and counts, everything else belongs to the admin screens.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One of the club's three elected offices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClubOffice {
    President,
    Secretary,
    Treasurer,
    /// Any other club-level office (committee chair etc.).
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub id: Uuid,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// Club roster number, displayed as "No.x".
    pub member_no: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
    /// The member who sponsored this member's admission.
    pub sponsor_id: Option<Uuid>,
    pub office: Option<ClubOffice>,
    /// District/cabinet appointment title, free text.
    pub cabinet_title: Option<String>,
    pub joined_on: Option<NaiveDate>,
    pub address: Option<String>,
    /// Push registration token; None until the member grants notification
    /// permission on a device.
    pub device_token: Option<String>,
}

impl Member {
    /// Sort rank for the directory: officers first (president, secretary,
    /// treasurer, then other offices), cabinet appointees next, everyone
    /// else last.
    pub fn directory_rank(&self) -> u8 {
        match self.office {
            Some(ClubOffice::President) => 1,
            Some(ClubOffice::Secretary) => 2,
            Some(ClubOffice::Treasurer) => 3,
            Some(ClubOffice::Other) => 4,
            None if self.cabinet_title.is_some() => 10,
            None => 99,
        }
    }
}

/// Order members for the directory view: rank, then member number, then name.
pub fn directory_order(members: &mut [Member]) {
    members.sort_by(|a, b| {
        a.directory_rank()
            .cmp(&b.directory_rank())
            .then_with(|| a.member_no.cmp(&b.member_no))
            .then_with(|| a.full_name.cmp(&b.full_name))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(name: &str, office: Option<ClubOffice>, cabinet: Option<&str>) -> Member {
        Member {
            id: Uuid::new_v4(),
            full_name: name.to_string(),
            email: None,
            phone: None,
            member_no: None,
            is_admin: false,
            sponsor_id: None,
            office,
            cabinet_title: cabinet.map(str::to_string),
            joined_on: None,
            address: None,
            device_token: None,
        }
    }

    #[test]
    fn directory_puts_officers_before_cabinet_before_rest() {
        let mut members = vec![
            member("rank and file", None, None),
            member("zone chair", None, Some("ゾーンチェアパーソン")),
            member("treasurer", Some(ClubOffice::Treasurer), None),
            member("president", Some(ClubOffice::President), None),
            member("secretary", Some(ClubOffice::Secretary), None),
        ];
        directory_order(&mut members);
        let names: Vec<&str> = members.iter().map(|m| m.full_name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "president",
                "secretary",
                "treasurer",
                "zone chair",
                "rank and file"
            ]
        );
    }
}

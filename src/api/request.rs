use serde::Serialize;

/// Only the first page is ever requested.
pub const PAGE_NUM: u32 = 1;
pub const PAGE_SIZE: u32 = 10;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Login<'a> {
    pub mail: &'a str,
    pub password: &'a str,
    pub mail_code: &'a str,
    pub email_or_phone: u8,
}

impl<'a> Login<'a> {
    pub fn new(mail: &'a str, password: &'a str) -> Self {
        Login {
            mail,
            password,
            mail_code: "",
            email_or_phone: 0,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryQo {
    pub page_num: u32,
    pub page_size: u32,
}

impl Default for QueryQo {
    fn default() -> Self {
        QueryQo {
            page_num: PAGE_NUM,
            page_size: PAGE_SIZE,
        }
    }
}

#[derive(Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct StationPage {
    pub search_value: Option<String>,
    pub collected: u8,
    pub sort_type: u8,
    pub status: u8,
    pub station_type: Option<u8>,
    pub exists_owner: Option<u8>,
    pub query_qo: QueryQo,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StationDetails<'a> {
    pub station_id: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DevicePage<'a> {
    pub query_qo: QueryQo,
    pub search_type: Option<u8>,
    pub power_station_id: &'a str,
}

impl<'a> DevicePage<'a> {
    pub fn new(power_station_id: &'a str) -> Self {
        DevicePage {
            query_qo: QueryQo::default(),
            search_type: None,
            power_station_id,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InverterDetails<'a> {
    pub wn_id: &'a str,
    pub station_id: &'a str,
}

#[cfg(test)]
mod test {
    use serde_json::json;

    #[test]
    fn station_page_matches_wire_format() {
        let body = serde_json::to_value(super::StationPage::default()).unwrap();
        assert_eq!(
            body,
            json!({
                "searchValue": null,
                "collected": 0,
                "sortType": 0,
                "status": 0,
                "stationType": null,
                "existsOwner": null,
                "queryQo": {"pageNum": 1, "pageSize": 10}
            })
        );
    }

    #[test]
    fn login_sends_empty_mail_code() {
        let body = serde_json::to_value(super::Login::new("a@b.c", "secret")).unwrap();
        assert_eq!(
            body,
            json!({"mail": "a@b.c", "password": "secret", "mailCode": "", "emailOrPhone": 0})
        );
    }
}

pub type Endpoint = str;

pub const LOGIN: &Endpoint = "user/login";
pub const LOGOUT: &Endpoint = "user/logout";
pub const STATIONS: &Endpoint = "station/UI2Page";
pub const STATION_DETAILS: &Endpoint = "station/getStationDataDetails";
pub const DEVICES: &Endpoint = "station/getDevicesListInsideStation";
pub const INVERTER_DETAILS: &Endpoint = "wnData/getWnDataDetails";

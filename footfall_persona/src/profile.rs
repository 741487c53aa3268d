//! Demographic profile enrichment.
//!
//! Profiles come from a randomuser.me-shaped HTTP source: one GET per
//! fetch, one person record per response. The source is known to emit
//! garbage birth dates on occasion; those are repaired with a substitute
//! date rather than surfaced as errors. Transport failures and structurally
//! broken payloads are errors.

use rustc_hash::FxHashMap;
use serde::Deserialize;
use serde_json::Value;
use time::{
    Date, Month, OffsetDateTime,
    format_description::{BorrowedFormatItem, well_known::Rfc3339},
    macros::format_description,
};
use tracing::debug;

const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Endpoint used when no profile source is configured.
pub const DEFAULT_ENDPOINT: &str = "https://randomuser.me/api/";

#[derive(thiserror::Error, Debug)]
/// Errors produced while fetching a profile.
pub enum Error {
    /// The profile source was unreachable or returned a malformed payload.
    #[error("profile request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// The payload parsed but contained no person records.
    #[error("profile payload contained no records")]
    EmptyResults,
}

/// A normalized demographic profile.
///
/// All fields are already cleaned: the name and city are title-cased, the
/// birth date is a valid `YYYY-MM-DD` string and `age` is computed from it.
#[derive(Debug, Clone, Deserialize, serde::Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Profile {
    /// Full name, title-cased.
    pub name: String,
    /// Birth date, ISO `YYYY-MM-DD`.
    pub date_of_birth: String,
    /// City of residence, title-cased.
    pub city: String,
    /// Postal code, stringified whatever the source sent.
    pub postcode: String,
    /// Latitude as reported by the source.
    pub latitude: String,
    /// Longitude as reported by the source.
    pub longitude: String,
    /// Gender as reported by the source.
    pub gender: String,
    /// Landline phone number.
    pub phone: String,
    /// Mobile phone number.
    pub mobile: String,
    /// Age in whole years as of the fetch.
    pub age: i32,
    /// Email address.
    pub email: String,
}

impl Profile {
    /// Flatten this profile into an analytics property bag.
    #[must_use]
    pub fn into_properties(self) -> FxHashMap<String, Value> {
        let mut properties = FxHashMap::default();
        properties.insert("name".to_string(), Value::String(self.name));
        properties.insert("date_of_birth".to_string(), Value::String(self.date_of_birth));
        properties.insert("city".to_string(), Value::String(self.city));
        properties.insert("postcode".to_string(), Value::String(self.postcode));
        properties.insert("latitude".to_string(), Value::String(self.latitude));
        properties.insert("longitude".to_string(), Value::String(self.longitude));
        properties.insert("gender".to_string(), Value::String(self.gender));
        properties.insert("phone".to_string(), Value::String(self.phone));
        properties.insert("mobile".to_string(), Value::String(self.mobile));
        properties.insert("age".to_string(), Value::from(self.age));
        properties.insert("email".to_string(), Value::String(self.email));
        properties
    }

    fn from_payload<R>(payload: Payload, today: Date, rng: &mut R) -> Result<Self, Error>
    where
        R: rand::Rng + ?Sized,
    {
        let record = payload
            .results
            .into_iter()
            .next()
            .ok_or(Error::EmptyResults)?;
        Ok(Self::from_record(record, today, rng))
    }

    fn from_record<R>(record: Record, today: Date, rng: &mut R) -> Self
    where
        R: rand::Rng + ?Sized,
    {
        let birth = clean_date(rng, &record.dob.date);
        Self {
            name: format!(
                "{} {}",
                title_case(&record.name.first),
                title_case(&record.name.last)
            ),
            date_of_birth: iso_date(birth),
            city: title_case(&record.location.city),
            postcode: record.location.postcode.into_string(),
            latitude: record.location.coordinates.latitude,
            longitude: record.location.coordinates.longitude,
            gender: record.gender,
            phone: record.phone,
            mobile: record.cell,
            age: age_on(today, birth),
            email: record.email,
        }
    }
}

// Wire shape of the person-data source. Only the fields we consume; the
// source sends plenty more.
#[derive(Debug, Deserialize)]
struct Payload {
    results: Vec<Record>,
}

#[derive(Debug, Deserialize)]
struct Record {
    gender: String,
    name: Name,
    location: Location,
    email: String,
    dob: Dob,
    phone: String,
    cell: String,
}

#[derive(Debug, Deserialize)]
struct Name {
    first: String,
    last: String,
}

#[derive(Debug, Deserialize)]
struct Location {
    city: String,
    postcode: Postcode,
    coordinates: Coordinates,
}

// The source emits postcodes as strings or bare numbers depending on the
// nationality of the generated person.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Postcode {
    Text(String),
    Number(i64),
}

impl Postcode {
    fn into_string(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Number(number) => number.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Coordinates {
    latitude: String,
    longitude: String,
}

#[derive(Debug, Deserialize)]
struct Dob {
    date: String,
}

/// Parse a birth date, substituting a random one when the source sent
/// garbage.
///
/// Accepts plain `YYYY-MM-DD` dates and RFC 3339 timestamps. Anything else
/// is replaced by a uniform random date with year in `[1950, 2000]`, month
/// in `[1, 12]` and day in `[1, 28]`, sidestepping month-length edge cases.
pub fn clean_date<R>(rng: &mut R, raw: &str) -> Date
where
    R: rand::Rng + ?Sized,
{
    if let Ok(date) = Date::parse(raw, DATE_FORMAT) {
        return date;
    }
    if let Ok(timestamp) = OffsetDateTime::parse(raw, &Rfc3339) {
        return timestamp.date();
    }

    let year = rng.random_range(1950..=2000);
    let month = Month::try_from(rng.random_range(1u8..=12)).expect("month is in 1..=12");
    let day = rng.random_range(1u8..=28);
    let substitute =
        Date::from_calendar_date(year, month, day).expect("every month has at least 28 days");
    debug!(raw, %substitute, "repaired unparseable birth date");
    substitute
}

/// Whole years between `birth` and `today`, decremented by one when the
/// birthday has not yet come around this year.
#[must_use]
pub fn age_on(today: Date, birth: Date) -> i32 {
    let mut years = today.year() - birth.year();
    if (u8::from(today.month()), today.day()) < (u8::from(birth.month()), birth.day()) {
        years -= 1;
    }
    years
}

fn iso_date(date: Date) -> String {
    format!(
        "{year:04}-{month:02}-{day:02}",
        year = date.year(),
        month = u8::from(date.month()),
        day = date.day()
    )
}

fn title_case(raw: &str) -> String {
    let mut chars = raw.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// HTTP client for the person-data source.
#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    endpoint: String,
}

impl Client {
    /// Create a client against `endpoint`.
    #[must_use]
    pub fn new(endpoint: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint,
        }
    }

    /// Fetch and normalize one profile.
    ///
    /// The rng is only consulted when the source's birth date needs
    /// repairing.
    ///
    /// # Errors
    ///
    /// Function will return an error if the source is unreachable, responds
    /// with a non-success status, sends a payload that does not parse, or
    /// sends a payload with no person records.
    pub async fn fetch<R>(&self, rng: &mut R) -> Result<Profile, Error>
    where
        R: rand::Rng + ?Sized,
    {
        let payload: Payload = self
            .http
            .get(&self.endpoint)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Profile::from_payload(payload, OffsetDateTime::now_utc().date(), rng)
    }
}

/// Configuration for a profile [`Source`].
#[derive(Debug, Deserialize, serde::Serialize, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
#[serde(deny_unknown_fields)]
pub enum Config {
    /// Fetch live profiles from a randomuser-style endpoint.
    Api {
        /// Endpoint URI returning one random person record per request.
        uri: String,
    },
    /// Serve the same canned profile on every fetch, no network involved.
    Fixed {
        /// The profile to serve.
        profile: Box<Profile>,
    },
}

impl Default for Config {
    fn default() -> Self {
        Self::Api {
            uri: DEFAULT_ENDPOINT.to_string(),
        }
    }
}

/// A source of demographic profiles.
#[derive(Debug)]
pub enum Source {
    /// Live HTTP source.
    Api(Client),
    /// Canned profile, for deterministic runs and tests.
    Fixed(Box<Profile>),
}

impl Source {
    /// Build a source from its configuration.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        match config {
            Config::Api { uri } => Self::Api(Client::new(uri.clone())),
            Config::Fixed { profile } => Self::Fixed(profile.clone()),
        }
    }

    /// Produce one profile.
    ///
    /// # Errors
    ///
    /// Function will return an error if the underlying source signals error;
    /// the fixed variant is infallible.
    pub async fn fetch<R>(&self, rng: &mut R) -> Result<Profile, Error>
    where
        R: rand::Rng + ?Sized,
    {
        match self {
            Self::Api(client) => client.fetch(rng).await,
            Self::Fixed(profile) => Ok(profile.as_ref().clone()),
        }
    }
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;
    use rand::{SeedableRng, rngs::SmallRng};
    use time::macros::date;

    use super::{Error, Payload, Profile, age_on, clean_date, iso_date, title_case};

    #[test]
    fn clean_date_keeps_valid_dates() {
        let mut rng = SmallRng::seed_from_u64(1);
        let date = clean_date(&mut rng, "1987-06-15");
        assert_eq!(date, date!(1987 - 06 - 15));
        assert_eq!(iso_date(date), "1987-06-15");
    }

    #[test]
    fn clean_date_accepts_timestamps() {
        let mut rng = SmallRng::seed_from_u64(2);
        let date = clean_date(&mut rng, "1962-03-09T04:51:33.312Z");
        assert_eq!(date, date!(1962 - 03 - 09));
    }

    #[test]
    fn clean_date_repairs_garbage() {
        let mut rng = SmallRng::seed_from_u64(3);
        for raw in ["", "garbage", "1987-13-40", "15/06/1987"] {
            let date = clean_date(&mut rng, raw);
            assert!((1950..=2000).contains(&date.year()), "{raw} -> {date}");
            assert!(date.day() <= 28);
        }
    }

    proptest! {
        // Repair never panics and always lands in the substitute range for
        // strings the source genuinely garbled.
        #[test]
        fn clean_date_total(seed: u64, raw in "\\PC*") {
            prop_assume!(time::Date::parse(&raw, super::DATE_FORMAT).is_err());
            prop_assume!(time::OffsetDateTime::parse(&raw, &super::Rfc3339).is_err());

            let mut rng = SmallRng::seed_from_u64(seed);
            let date = clean_date(&mut rng, &raw);
            prop_assert!((1950..=2000).contains(&date.year()));
            prop_assert!(date.day() <= 28);
        }
    }

    #[test]
    fn age_counts_birthday_today() {
        assert_eq!(age_on(date!(2020 - 06 - 15), date!(1990 - 06 - 15)), 30);
    }

    #[test]
    fn age_counts_birthday_tomorrow() {
        assert_eq!(age_on(date!(2020 - 06 - 15), date!(1990 - 06 - 16)), 29);
        assert_eq!(age_on(date!(2020 - 06 - 15), date!(1990 - 07 - 01)), 29);
    }

    const FIXTURE: &str = r#"{
        "results": [{
            "gender": "female",
            "name": {"title": "Ms", "first": "jeanne", "last": "dubois"},
            "location": {
                "street": {"number": 4331, "name": "rue de la paix"},
                "city": "lyon",
                "postcode": 69002,
                "coordinates": {"latitude": "45.7640", "longitude": "4.8357"}
            },
            "email": "jeanne.dubois@example.com",
            "dob": {"date": "1987-06-15", "age": 33},
            "phone": "04-11-22-33-44",
            "cell": "06-55-66-77-88",
            "nat": "FR"
        }],
        "info": {"seed": "abc", "results": 1, "page": 1, "version": "1.4"}
    }"#;

    #[test]
    fn payload_maps_to_profile() {
        let payload: Payload = serde_json::from_str(FIXTURE).expect("fixture parses");
        let mut rng = SmallRng::seed_from_u64(4);
        let profile = Profile::from_payload(payload, date!(2020 - 06 - 15), &mut rng)
            .expect("fixture has one record");

        assert_eq!(profile.name, "Jeanne Dubois");
        assert_eq!(profile.city, "Lyon");
        assert_eq!(profile.postcode, "69002");
        assert_eq!(profile.date_of_birth, "1987-06-15");
        assert_eq!(profile.age, 33);
        assert_eq!(profile.mobile, "06-55-66-77-88");
    }

    #[test]
    fn empty_results_is_an_error() {
        let payload: Payload =
            serde_json::from_str(r#"{"results": []}"#).expect("payload parses");
        let mut rng = SmallRng::seed_from_u64(5);
        let result = Profile::from_payload(payload, date!(2020 - 06 - 15), &mut rng);
        assert!(matches!(result, Err(Error::EmptyResults)));
    }

    #[test]
    fn title_case_uppercases_first() {
        assert_eq!(title_case("jeanne"), "Jeanne");
        assert_eq!(title_case("DUBOIS"), "Dubois");
        assert_eq!(title_case(""), "");
    }
}

use url::Url;

use crate::{
    error::WeatherKitError,
    model::{DATA_SETS, WeatherKitRequest, text},
};

pub const WEATHERKIT_BASE_URL: &str = "https://weatherkit.apple.com/api/v1/weather";

/// Builds weather URLs below a base such as [`WEATHERKIT_BASE_URL`].
#[derive(Debug, Clone)]
pub struct Endpoint {
    base: Url,
}

impl Default for Endpoint {
    fn default() -> Self {
        Self {
            base: Url::parse(WEATHERKIT_BASE_URL).expect("WeatherKit base URL is valid"),
        }
    }
}

impl Endpoint {
    pub fn new(base: Url) -> Self {
        Self { base }
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// `{base}/{language}/{latitude}/{longitude}?timezone=..&countryCode=..&dataSets=..`
    ///
    /// Each path value is pushed as exactly one percent-encoded segment.
    pub fn weather_url(&self, request: &WeatherKitRequest) -> Result<Url, WeatherKitError> {
        let latitude = request.latitude.as_ref().map(ToString::to_string).unwrap_or_default();
        let longitude = request.longitude.as_ref().map(ToString::to_string).unwrap_or_default();

        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| {
                WeatherKitError::Endpoint(format!("{} cannot be a base URL", self.base))
            })?
            .pop_if_empty()
            .extend([text(&request.language), latitude.as_str(), longitude.as_str()]);

        url.query_pairs_mut()
            .clear()
            .append_pair("timezone", text(&request.timezone))
            .append_pair("countryCode", text(&request.country_code))
            .append_pair("dataSets", DATA_SETS);

        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Coordinate;

    fn request() -> WeatherKitRequest {
        WeatherKitRequest {
            language: Some("en".into()),
            latitude: Some(Coordinate::from(37.323)),
            longitude: Some(Coordinate::Text("-122.032".into())),
            timezone: Some("America/Los_Angeles".into()),
            country_code: Some("US".into()),
            ..Default::default()
        }
    }

    #[test]
    fn path_segments_are_language_latitude_longitude() {
        let url = Endpoint::default().weather_url(&request()).unwrap();

        assert_eq!(url.host_str(), Some("weatherkit.apple.com"));
        let segments: Vec<_> = url.path_segments().unwrap().collect();
        assert_eq!(segments, ["api", "v1", "weather", "en", "37.323", "-122.032"]);
    }

    #[test]
    fn segment_values_are_percent_encoded() {
        let mut req = request();
        req.language = Some("zh/Hant TW".into());

        let url = Endpoint::default().weather_url(&req).unwrap();

        assert_eq!(url.path(), "/api/v1/weather/zh%2FHant%20TW/37.323/-122.032");
    }

    #[test]
    fn query_always_requests_all_data_sets() {
        let url = Endpoint::default().weather_url(&request()).unwrap();

        assert_eq!(
            url.query(),
            Some(
                "timezone=America%2FLos_Angeles&countryCode=US\
                 &dataSets=currentWeather%2CforecastNextHour%2CforecastDaily%2CweatherAlerts"
            )
        );

        let bare = Endpoint::default().weather_url(&WeatherKitRequest::default()).unwrap();
        assert!(
            bare.query()
                .unwrap()
                .contains("dataSets=currentWeather%2CforecastNextHour%2CforecastDaily%2CweatherAlerts")
        );
    }

    #[test]
    fn custom_base_with_trailing_slash() {
        let endpoint = Endpoint::new(Url::parse("http://127.0.0.1:8080/").unwrap());
        let url = endpoint.weather_url(&request()).unwrap();

        assert_eq!(url.path(), "/en/37.323/-122.032");
    }

    #[test]
    fn non_hierarchical_base_is_rejected() {
        let endpoint = Endpoint::new(Url::parse("mailto:someone@example.com").unwrap());
        let err = endpoint.weather_url(&request()).unwrap_err();

        assert!(matches!(err, WeatherKitError::Endpoint(_)));
    }
}

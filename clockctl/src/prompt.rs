use inquire::{CustomUserError, validator::Validation};
use libclock::{employee::Employee, geo::Coordinates, store::Store};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Prompt(#[from] inquire::InquireError),
    #[error(transparent)]
    Library(#[from] libclock::Error),
}

fn required(input: &str) -> Result<Validation, CustomUserError> {
    match input.trim().is_empty() {
        true => Ok(Validation::Invalid("A value is required".into())),
        false => Ok(Validation::Valid),
    }
}

/// QR tokens and badges are printed into QR codes and typed into URLs, so
/// they must not contain whitespace
pub(crate) fn validate_token(input: &str) -> Result<Validation, CustomUserError> {
    if input.is_empty() {
        Ok(Validation::Invalid("A value is required".into()))
    } else if input.chars().any(char::is_whitespace) {
        Ok(Validation::Invalid("The value must not contain spaces".into()))
    } else {
        Ok(Validation::Valid)
    }
}

pub(crate) fn prompt_employee() -> Result<Employee, Error> {
    let name = inquire::Text::new("Name:")
        .with_validator(required)
        .prompt()?;
    let qr_code = inquire::Text::new("Badge QR code:")
        .with_validator(validate_token)
        .prompt()?;
    Ok(Employee::new(name, qr_code))
}

pub(crate) fn prompt_token(message: &str) -> Result<String, Error> {
    inquire::Text::new(message)
        .with_validator(validate_token)
        .prompt()
        .map_err(|e| e.into())
}

pub(crate) fn prompt_store() -> Result<Store, Error> {
    let name = inquire::Text::new("Name:")
        .with_validator(required)
        .prompt()?;
    let token = prompt_token("Store QR token:")?;
    let latitude = inquire::CustomType::<f64>::new("Latitude:")
        .with_error_message("Please type a valid number")
        .prompt()?;
    let longitude = inquire::CustomType::<f64>::new("Longitude:")
        .with_error_message("Please type a valid number")
        .prompt()?;
    Coordinates::new(latitude, longitude).validate()?;
    let radius = inquire::CustomType::<u32>::new("Geofence radius in meters:")
        .with_default(libclock::store::DEFAULT_RADIUS_METERS)
        .prompt()?;
    Ok(Store::new(name, token, latitude, longitude, Some(radius)))
}

/// Ask the user to confirm a destructive action. Returns true without asking
/// if `assume_yes` is set
pub(crate) fn confirm(message: &str, assume_yes: bool) -> Result<bool, Error> {
    if assume_yes {
        return Ok(true);
    }
    inquire::Confirm::new(message)
        .with_default(false)
        .prompt()
        .map_err(|e| e.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_token() {
        assert!(matches!(validate_token("office_hq"), Ok(Validation::Valid)));
        assert!(matches!(validate_token(""), Ok(Validation::Invalid(_))));
        assert!(matches!(
            validate_token("office hq"),
            Ok(Validation::Invalid(_))
        ));
        assert!(matches!(required("  "), Ok(Validation::Invalid(_))));
    }

    #[test]
    fn test_confirm_assume_yes() {
        assert!(confirm("Really?", true).unwrap());
    }
}

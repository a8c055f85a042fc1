use crate::models::{CreatePollRequest, NewPoll, PollUpdate, UpdatePollRequest};

pub const MIN_TITLE_LENGTH: usize = 3;
pub const MAX_TITLE_LENGTH: usize = 200;
pub const MAX_DESCRIPTION_LENGTH: usize = 500;
pub const MIN_OPTIONS: usize = 2;
pub const MAX_OPTIONS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Title and at least {} options are required", MIN_OPTIONS)]
    MissingFields,
    #[error("Title must be between {} and {} characters", MIN_TITLE_LENGTH, MAX_TITLE_LENGTH)]
    TitleLength,
    #[error("Description must be at most {} characters", MAX_DESCRIPTION_LENGTH)]
    DescriptionTooLong,
    #[error("At least {} non-empty options are required", MIN_OPTIONS)]
    TooFewOptions,
    #[error("Maximum {} options allowed", MAX_OPTIONS)]
    TooManyOptions,
    #[error("No changes provided")]
    EmptyUpdate,
    #[error("option_index is required")]
    MissingOptionIndex,
    #[error("Invalid option index")]
    InvalidOptionIndex,
}

fn char_len(value: &str) -> usize {
    value.chars().count()
}

pub fn validate_title(title: &str) -> Result<String, ValidationError> {
    let title = title.trim();
    let len = char_len(title);
    if !(MIN_TITLE_LENGTH..=MAX_TITLE_LENGTH).contains(&len) {
        return Err(ValidationError::TitleLength);
    }
    Ok(title.to_string())
}

/// Trims the description; blank text counts as no description.
pub fn validate_description(description: Option<&str>) -> Result<Option<String>, ValidationError> {
    let Some(description) = description.map(str::trim).filter(|d| !d.is_empty()) else {
        return Ok(None);
    };
    if char_len(description) > MAX_DESCRIPTION_LENGTH {
        return Err(ValidationError::DescriptionTooLong);
    }
    Ok(Some(description.to_string()))
}

/// Trims every option and drops the empty ones. Duplicate labels are allowed.
pub fn validate_options(options: &[String]) -> Result<Vec<String>, ValidationError> {
    let options: Vec<String> = options
        .iter()
        .map(|opt| opt.trim())
        .filter(|opt| !opt.is_empty())
        .map(str::to_string)
        .collect();

    if options.len() < MIN_OPTIONS { return Err(ValidationError::TooFewOptions); }
    if options.len() > MAX_OPTIONS { return Err(ValidationError::TooManyOptions); }
    Ok(options)
}

pub fn validate_poll_request(request: &CreatePollRequest) -> Result<NewPoll, ValidationError> {
    if request.title.trim().is_empty() || request.options.len() < MIN_OPTIONS {
        return Err(ValidationError::MissingFields);
    }

    let title = validate_title(&request.title)?;
    let description = validate_description(request.description.as_deref())?;
    let options = validate_options(&request.options)?;

    Ok(NewPoll { title, description, options })
}

pub fn validate_poll_update(request: &UpdatePollRequest) -> Result<PollUpdate, ValidationError> {
    let update = PollUpdate {
        title: request.title.as_deref().map(validate_title).transpose()?,
        description: match request.description.as_deref() {
            Some(description) => Some(validate_description(Some(description))?),
            None => None,
        },
    };

    if update.is_empty() {
        return Err(ValidationError::EmptyUpdate);
    }
    Ok(update)
}

pub fn validate_option_index(index: Option<i32>, option_count: i32) -> Result<i32, ValidationError> {
    let index = index.ok_or(ValidationError::MissingOptionIndex)?;
    if index < 0 || index >= option_count {
        return Err(ValidationError::InvalidOptionIndex);
    }
    Ok(index)
}

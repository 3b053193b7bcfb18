//! Prompt templates sent to the chat model

use crate::models::Variant;

const LIST_PROMPT: &str = "As an expert in location-based services and geospatial data, your task is to provide a precise and accurate list of nearby soil testing labs \
for the specified location. Please return the response in a well-structured JSON format. \
Each entry should include the lab's name and a direct Google Maps link for easy navigation. \
Ensure the JSON output follows this structure: [{'name': 'Lab 1', 'link': 'https://www.google.com/maps/...'}, ...]. \
Please make sure the response is clean and contains only the JSON data, without any additional explanations or text.";

const MAP_PROMPT: &str = "As an expert in location-based services and geospatial data, your task is to provide a precise and accurate list of nearby soil testing labs \
for the specified location. Please return the response in a well-structured JSON format. \
Each entry should include the lab's name, latitude, longitude, and a direct Google Maps link for easy navigation. \
Ensure the JSON output follows this structure: [{'name': 'Lab 1', 'latitude': lat, 'longitude': lon, 'link': 'https://www.google.com/maps/...'}, ...]. \
Please make sure the response is clean and contains only the JSON data, without any additional explanations or text.";

/// Instruction template for a variant, without the location
#[must_use]
pub fn template(variant: Variant) -> &'static str {
    match variant {
        Variant::List => LIST_PROMPT,
        Variant::Map => MAP_PROMPT,
    }
}

/// Template followed by the location exactly as typed.
///
/// The location is not trimmed or validated; callers gate empty input.
#[must_use]
pub fn build_prompt(variant: Variant, location: &str) -> String {
    let template = template(variant);
    let mut prompt = String::with_capacity(template.len() + location.len());
    prompt.push_str(template);
    prompt.push_str(location);
    prompt
}

//! Prompt assembly from a selection set.
//!
//! Option choices are mapped to phrase fragments through small lookup tables;
//! choices without an entry are used verbatim.

use crate::aspect::describe_aspect_ratio;
use crate::error::JobError;
use crate::selection::{SelectionSet, keys};

type PhraseTable = &'static [(&'static str, &'static str)];

const HAIR_TEXTURE: PhraseTable = &[
    ("Straight", "sleek straight hair"),
    ("Wavy", "soft wavy hair"),
    ("Curly", "defined curly hair"),
    ("Coily", "voluminous coily hair"),
];

const SKIN: PhraseTable = &[
    ("Clear", "clear even skin"),
    ("Klare Haut", "clear even skin"),
    ("Freckles", "natural freckles across nose and cheeks"),
    ("Sommersprossen", "natural freckles across nose and cheeks"),
];

/// Object type labels that get the pendant scale sentence, matched on prefix.
const PENDANT_LABELS: &[&str] = &["Kettenanhänger", "Pendant", "Necklace pendant"];

const WIND: PhraseTable = &[
    ("Static", "hair resting still"),
    ("Soft Breeze", "hair lifted by a soft breeze"),
    ("Strong Wind", "hair whipped by strong wind"),
];

const FILM_LOOK: PhraseTable = &[
    ("Standard Commercial", "clean commercial color grade"),
    ("Kodak Portra 400", "warm Kodak Portra 400 film tones"),
    ("Teal & Orange", "teal and orange blockbuster grade"),
    ("Black & White", "high-contrast black and white noir"),
    ("Pastel", "soft pastel dreamy palette"),
    ("Moody", "moody desaturated dark grade"),
];

const LIGHTING: PhraseTable = &[
    ("Soft Beauty Light", "soft frontal beauty light with gentle fill"),
    ("Golden Hour", "warm golden hour backlight"),
    ("Rembrandt", "Rembrandt key light with a triangle of light on the cheek"),
    ("Cinematic Contrast", "cinematic high-contrast key and rim light"),
    ("Neon", "saturated neon edge lighting"),
];

const LENS: PhraseTable = &[
    ("85mm", "85mm portrait lens, shallow depth of field"),
    ("100mm Macro", "100mm macro lens, crisp product detail"),
    ("35mm", "35mm lifestyle lens"),
    ("24mm", "24mm wide lens"),
];

/// Looks up the phrase for a choice. Matches on prefix so decorated labels
/// like `"Wavy (Wellig)"` still resolve.
fn lookup<'a>(table: PhraseTable, choice: &'a str) -> &'a str {
    table
        .iter()
        .find(|(key, _)| choice.starts_with(key))
        .map(|(_, phrase)| *phrase)
        .unwrap_or(choice)
}

/// System prompt for the polish call.
pub const POLISH_SYSTEM_PROMPT: &str = "You are an expert prompt engineer for photorealistic \
image models. Write a single, comprehensive paragraph prompt in English. Keep every concrete \
detail from the brief, prefer photographic vocabulary, and include subsurface scattering and \
micropore skin texture. Return only the prompt.";

/// Reminder shown when a reference image has to accompany the prompt.
pub const REFERENCE_REMINDER: &str =
    "Upload your product reference image together with this prompt.";

/// Stage-one instruction for hybrid generation.
pub const HYBRID_BASE_INSTRUCTION: &str = "Render the scene only. Do not render any text, \
letters, logos or typography anywhere in the image.";

/// The assembled prompt and anything the caller should tell the user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssembledPrompt {
    /// The brief sent to the polish call or directly to the image model.
    pub text: String,
    /// Set when the product reference image must be supplied.
    pub reminder: Option<&'static str>,
}

fn size_instruction(selection: &SelectionSet) -> Result<Option<String>, JobError> {
    let Some(size) = selection.number(keys::OBJECT_SIZE_CM)? else {
        return Ok(None);
    };
    let is_pendant = selection
        .get(keys::OBJECT_TYPE)
        .is_some_and(|kind| PENDANT_LABELS.iter().any(|label| kind.starts_with(label)));
    Ok(Some(if is_pendant {
        format!("SCALE: The necklace pendant must be rendered exactly {size}cm in height, appearing delicate.")
    } else {
        format!("SCALE: The product object is approximately {size}cm in size relative to the model.")
    }))
}

fn product_instruction(
    selection: &SelectionSet,
    product: &str,
) -> Result<(String, Option<&'static str>), JobError> {
    let size = size_instruction(selection)?
        .map(|s| format!(" {s}"))
        .unwrap_or_default();
    if selection.flag(keys::WEAR_PRODUCT) {
        Ok((
            format!(
                "A REFERENCE IMAGE of the product '{product}' is provided. Use it for precise \
                 in-context blending; the model wears exactly this item. Focus strictly on \
                 '{product}'.{size}"
            ),
            Some(REFERENCE_REMINDER),
        ))
    } else {
        Ok((
            format!(
                "Campaign for '{product}'. No reference item is supplied; generate a \
                 high-quality representation from the description.{size}"
            ),
            None,
        ))
    }
}

fn background_instruction(selection: &SelectionSet) -> String {
    match selection.get(keys::BACKGROUND_COLOR) {
        Some(hex) => format!("Solid background with exact hex color code {hex}, minimal studio style"),
        None => format!(
            "{} background",
            selection.get_or(keys::BACKGROUND, "Clean White Studio")
        ),
    }
}

/// Builds the user prompt for a validated selection.
pub fn assemble_user_prompt(selection: &SelectionSet) -> Result<AssembledPrompt, JobError> {
    selection.validate()?;
    let product = selection.product().unwrap_or_default();
    let (product_text, reminder) = product_instruction(selection, product)?;

    let outfit = match selection.get(keys::CLOTHING) {
        Some(clothing) => format!("OUTFIT: Model is wearing {clothing}."),
        None => "OUTFIT: High-fashion minimal clothing.".to_string(),
    };

    let text = format!(
        "SUBJECT: {gender}, {age}, {ethnicity}.\n\
         LOOK: {texture}, {hair_color} hair, {hair_style}, {wind}. {eyes} eyes.\n\
         SKIN: {skin}, {makeup} makeup. Subsurface scattering and micropore texture.\n\
         {outfit}\n\
         POSE: {pose}, {gaze}, {expression}.\n\
         PRODUCT CONTEXT: {product_text}\n\
         SCENE: {background}. {lighting}. ATMOSPHERE: {weather}. COLOR GRADE: {film}.\n\
         CAMERA: {framing}, {lens}. {camera_move}.\n\
         FORMAT: {format}.",
        gender = selection.get_or(keys::GENDER, "Female Model"),
        age = selection.get_or(keys::AGE, "25-34"),
        ethnicity = selection.get_or(keys::ETHNICITY, "olive skin tone"),
        texture = lookup(HAIR_TEXTURE, selection.get_or(keys::HAIR_TEXTURE, "Wavy")),
        hair_color = selection.get_or(keys::HAIR_COLOR, "dark brown"),
        hair_style = selection.get_or(keys::HAIR_STYLE, "Loose & Open"),
        wind = lookup(WIND, selection.get_or(keys::WIND, "Soft Breeze")),
        eyes = selection.get_or(keys::EYE_COLOR, "green"),
        skin = lookup(SKIN, selection.get_or(keys::SKIN, "Clear")),
        makeup = selection.get_or(keys::MAKEUP, "Natural/Clean"),
        pose = selection.get_or(keys::POSE, "Standing Upright (Power Pose)"),
        gaze = selection.get_or(keys::GAZE, "Straight into Camera (Eye Contact)"),
        expression = selection.get_or(keys::EXPRESSION, "Neutral & Cool"),
        background = background_instruction(selection),
        lighting = lookup(LIGHTING, selection.get_or(keys::LIGHTING, "Soft Beauty Light")),
        weather = selection.get_or(keys::WEATHER, "Clear/Sunny"),
        film = lookup(FILM_LOOK, selection.get_or(keys::FILM_LOOK, "Standard Commercial")),
        framing = selection.get_or(keys::FRAMING, "Portrait (Head & Shoulders)"),
        lens = lookup(LENS, selection.get_or(keys::LENS, "85mm")),
        camera_move = selection.get_or(keys::CAMERA_MOVE, "Static Tripod"),
        format = describe_aspect_ratio(selection.get_or(keys::ASPECT_RATIO, "1:1")),
    );

    Ok(AssembledPrompt { text, reminder })
}

/// Stage-one prompt for hybrid generation: the scene without any text.
pub fn hybrid_base_prompt(prompt: &str) -> String {
    format!("{prompt}\n\n{HYBRID_BASE_INSTRUCTION}")
}

/// Stage-two instruction: overlay the ad copy and refine without touching the product.
pub fn hybrid_overlay_prompt(ad_copy: Option<&str>) -> String {
    let copy = match ad_copy {
        Some(copy) => format!("Overlay the headline \"{copy}\" in clean, legible typography that fits the layout."),
        None => "Leave the image free of text.".to_string(),
    };
    format!(
        "Use the supplied image as the base. {copy} Refine lighting and skin rendering. \
         Do not alter the product geometry, proportions or placement."
    )
}

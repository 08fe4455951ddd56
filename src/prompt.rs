//! The fixed meme-ify instruction sent upstream with every image.

/// How hard to push the transformation.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Intensity {
    /// A light touch
    Mild,
    /// The house style
    #[default]
    FullSend,
    /// Everything turned up
    Nuclear,
    /// Blown-out compression artifacts
    DeepFried,
}

impl Intensity {
    /// Parses the form value, falling back to the default for anything unknown.
    pub fn from_form(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("mild") => Self::Mild,
            Some("nuclear") => Self::Nuclear,
            Some("deep-fried") | Some("deep_fried") => Self::DeepFried,
            _ => Self::FullSend,
        }
    }

    fn style(self) -> &'static str {
        match self {
            Self::Mild => "slightly meme-ified with subtle humor",
            Self::FullSend => "absurd chaotic low-IQ internet meme energy with maximum brainrot",
            Self::Nuclear => {
                "EXTREME nuclear chaos, maximum distortion, completely unhinged and incomprehensible"
            }
            Self::DeepFried => "deep-fried JPEG artifact aesthetic with blown-out neon oversaturation",
        }
    }
}

/// Builds the instruction for the image model, appending the user's note if there is one.
pub fn build_prompt(intensity: Intensity, user_note: Option<&str>) -> String {
    let mut prompt = format!(
        "Transform this image into {}. \
         Add exaggerated facial expressions with bulging eyes and shocked dumb expressions. \
         Add chaotic ALL-CAPS Impact font captions at the top and bottom with ironic Gen-Z \
         brainrot humor: 'no cap fr fr', 'based', 'L ratio', 'he ate', 'rizz', 'bussin'. \
         Oversaturate all colors to neon extremes. \
         Add deep-fried JPEG compression artifact aesthetic. \
         Draw random red circles and red arrows pointing at completely irrelevant things. \
         Scatter random emojis (brain, skull, fire, crying laughing, rocket) across the image. \
         Apply slightly bad cropping and a few degrees of rotation. \
         Add a '$RTRD COIN' watermark in Comic Sans at the bottom corner. \
         The final result should look like it was made in MS Paint by a caffeinated raccoon at 3am.",
        intensity.style()
    );
    if let Some(note) = user_note.map(str::trim).filter(|note| !note.is_empty()) {
        prompt.push_str(" Also: ");
        prompt.push_str(note);
    }
    prompt
}

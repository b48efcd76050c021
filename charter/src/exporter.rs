use crate::beatmap::BeatMap;
use crate::error::Result;
use std::path::Path;

impl BeatMap {
    /// Export to the JSON chart schema
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self)?)
    }

    /// Export as a TypeScript module the game client can import directly
    pub fn to_typescript(&self) -> String {
        let var_name = format!("Song_{}", to_camel_case(&self.song_name));
        let mut output = String::new();

        output.push_str("// Song chart data definitions\n");
        output.push_str("// Generated by beatmap-charter\n\n");
        output.push_str("export interface SongChartData {\n");
        output.push_str("    songName: string;\n");
        output.push_str("    bpm: number;\n");
        output.push_str("    offset: number;\n");
        output.push_str("    // Lane values: 0 = Left, 1 = Center, 2 = Right\n");
        output.push_str("    notes: Array<{ beat: number; lane: number }>;\n");
        output.push_str("}\n\n");

        output.push_str(&format!("// Current Song: {}\n", self.song_name));
        output.push_str(&format!("// BPM: {}, Notes: {}\n", self.bpm, self.notes.len()));
        output.push_str(&format!("export const {}: SongChartData = {{\n", var_name));
        output.push_str(&format!("    songName: {:?},\n", self.song_name));
        output.push_str(&format!("    bpm: {},\n", self.bpm));
        output.push_str(&format!("    offset: {},\n", self.offset_seconds));
        output.push_str("    notes: [\n");

        let notes: Vec<String> = self
            .notes
            .iter()
            .map(|note| format!("        {{ beat: {}, lane: {} }}", note.beat, note.lane.index()))
            .collect();
        output.push_str(&notes.join(",\n"));
        if !notes.is_empty() {
            output.push('\n');
        }

        output.push_str("    ]\n");
        output.push_str("};\n\n");
        output.push_str("// Master list of all available songs\n");
        output.push_str("export const AllSongs: SongChartData[] = [\n");
        output.push_str(&format!("    {}\n", var_name));
        output.push_str("];\n");

        output
    }

    /// Save chart to file
    pub fn save(&self, path: &Path, format: ChartFormat) -> Result<()> {
        let content = match format {
            ChartFormat::Json => self.to_json()?,
            ChartFormat::TypeScript => self.to_typescript(),
        };

        std::fs::write(path, content)?;
        Ok(())
    }
}

/// "my song (v2)" -> "MySongV2"
pub fn to_camel_case(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();

    cleaned
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChartFormat {
    Json,
    TypeScript,
}

impl ChartFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(ChartFormat::Json),
            "typescript" | "ts" => Some(ChartFormat::TypeScript),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ChartFormat::Json => "json",
            ChartFormat::TypeScript => "ts",
        }
    }
}

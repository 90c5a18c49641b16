//! Locale strings used in the example exchange of the main prompt

/// Example answer and language name for one locale
#[derive(Debug, PartialEq, Eq)]
pub struct Translation {
    pub code: &'static str,
    pub local_language: &'static str,
    pub commit_feat: &'static str,
    pub commit_description: &'static str,
}

static TRANSLATIONS: &[Translation] = &[
    Translation {
        code: "en",
        local_language: "english",
        commit_feat: "feat(server.ts): add support for process.env.PORT environment variable",
        commit_description: "The port variable is now named PORT, which matches the naming convention for constants. Reading the port from the environment lets the server run on whatever port the host assigns.",
    },
    Translation {
        code: "de",
        local_language: "deutsch",
        commit_feat: "feat(server.ts): Unterstützung für die Umgebungsvariable process.env.PORT hinzufügen",
        commit_description: "Die Port-Variable heißt jetzt PORT, passend zur Namenskonvention für Konstanten. Durch die Umgebungsvariable kann der Server auf jedem vom Host vorgegebenen Port laufen.",
    },
    Translation {
        code: "fr",
        local_language: "français",
        commit_feat: "feat(server.ts): ajout de la prise en charge de la variable d'environnement process.env.PORT",
        commit_description: "La variable port s'appelle désormais PORT, conformément à la convention de nommage des constantes. La variable d'environnement permet au serveur d'écouter sur le port fourni par l'hôte.",
    },
    Translation {
        code: "es_ES",
        local_language: "español",
        commit_feat: "feat(server.ts): añadir soporte para la variable de entorno process.env.PORT",
        commit_description: "La variable port ahora se llama PORT, siguiendo la convención de nombres para constantes. Leer el puerto del entorno permite al servidor usar el puerto que asigne el host.",
    },
];

/// Look up a locale by code, falling back to English
pub fn translation(code: &str) -> &'static Translation {
    TRANSLATIONS
        .iter()
        .find(|t| t.code.eq_ignore_ascii_case(code))
        .or_else(|| {
            // "es" matches "es_ES"
            TRANSLATIONS
                .iter()
                .find(|t| t.code.split('_').next() == Some(code))
        })
        .unwrap_or(&TRANSLATIONS[0])
}

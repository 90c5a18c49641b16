//! Prompt construction for commit message generation

use super::i18n::{translation, Translation};
use super::ChatMessage;
use crate::chunking::token_budget::TokenBudgetManager;
use crate::chunking::token_estimator::TokenEstimator;
use crate::config::{CommitConfig, PromptModule};

pub const IDENTITY: &str = "You are to act as the author of a commit message in git.";

/// Maximum length of a commit title
pub const TITLE_LIMIT: usize = 72;

const EXAMPLE_DIFF: &str = r#"diff --git a/src/server.ts b/src/server.ts
index ad4db42..f3b18a9 100644
--- a/src/server.ts
+++ b/src/server.ts
@@ -10,7 +10,7 @@
 import {
     initWinstonLogger();

     const app = express();
-    const port = 7799;
+    const PORT = 7799;

     app.use(express.json());

@@ -34,6 +34,6 @@
     app.use(PROTECTED_ROUTER_URL, protectedRouter);

-    app.listen(port, () => {
-      console.log(`Server listening on port ${port}`);
+    app.listen(process.env.PORT || PORT, () => {
+      console.log(`Server listening on port ${PORT}`);
     });"#;

/// Builds prompts from an immutable commit configuration snapshot
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    commit: CommitConfig,
    issue_id: String,
    translation: &'static Translation,
}

impl PromptBuilder {
    pub fn new(commit: &CommitConfig, issue_id: impl Into<String>) -> Self {
        Self {
            commit: commit.clone(),
            issue_id: issue_id.into(),
            translation: translation(&commit.language),
        }
    }

    pub fn issue_id(&self) -> &str {
        &self.issue_id
    }

    pub fn locale(&self) -> &str {
        &self.commit.language
    }

    fn emoji_rule(&self, verb: &str) -> String {
        if self.commit.emoji {
            format!("Use GitMoji convention to preface the {}.", verb)
        } else {
            "Do not preface the commit with anything.".to_string()
        }
    }

    fn issue_enabled(&self) -> bool {
        self.commit.issue_enabled && !self.issue_id.is_empty()
    }

    fn system_prompt(&self) -> String {
        let description_rule = if self.commit.description {
            "Add a short description of WHY the changes are done after the single commit message title. Don't start it with \"This commit\", just describe the changes."
        } else {
            "Your response should just be one line with a commit message title and no description."
        };

        let issue_rule = if self.issue_enabled() {
            format!(
                "You must also include the Issue ID: {} in the commit message title.",
                self.issue_id
            )
        } else {
            "Don't include an Issue ID in the commit message title.".to_string()
        };

        let convention = match self.commit.prompt_module {
            PromptModule::ConventionalCommit => {
                "as per the conventional commit convention".to_string()
            }
            PromptModule::Commitlint => {
                let rules: Vec<String> = self
                    .commit
                    .commitlint_rules
                    .iter()
                    .map(|r| format!("- {}", r))
                    .collect();
                format!(
                    "that satisfies the following commitlint rules:\n{}\n",
                    rules.join("\n")
                )
            }
        };

        format!(
            "{IDENTITY} Your mission is to create a clean and comprehensive commit message {convention} \
             and explain WHAT were the changes and mainly WHY the changes were done.\n\
             I'll send you an output of 'git diff --staged' command, and you are to convert it into a commit message.\n\
             Only produce a single commit message for all files combined.\n\
             {emoji}\n{description_rule}\n{issue_rule}\n\
             Use the present tense. Lines must not be longer than {TITLE_LIMIT} characters. \
             Use {language} for the commit message.",
            emoji = self.emoji_rule("commit"),
            language = self.translation.local_language,
        )
    }

    fn consistency_example(&self) -> String {
        let prefix = if self.commit.emoji { "🐛 " } else { "" };
        let description = if self.commit.description {
            self.translation.commit_description
        } else {
            ""
        };
        format!("{}{}\n{}", prefix, self.translation.commit_feat, description)
    }

    /// Fixed part of every diff prompt: instruction and example exchange
    pub fn base_messages(&self) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(self.system_prompt()),
            ChatMessage::user(EXAMPLE_DIFF),
            ChatMessage::assistant(self.consistency_example()),
        ]
    }

    /// Full prompt for one diff or chunk
    pub fn diff_messages(&self, diff: &str) -> Vec<ChatMessage> {
        let mut messages = self.base_messages();
        messages.push(ChatMessage::user(diff));
        messages
    }

    /// Prompt compressing several partial commit messages into one
    pub fn summary_messages(&self, joined: &str) -> Vec<ChatMessage> {
        let description_rule = if self.commit.description {
            "Summarise the descriptions from the multiple messages into a single short description of WHY the changes are done after the commit message. Don't start it with \"This commit\", just describe the changes."
        } else {
            "The summarised commit message should just be one line with a commit message title and no description."
        };

        let issue_rule = if self.issue_enabled() {
            format!(
                "You must also keep the Issue ID {} in the summarised commit message title.",
                self.issue_id
            )
        } else {
            "Don't include an Issue ID in the summarised commit message title.".to_string()
        };

        let instruction = format!(
            "Summarise the following commit messages into a single commit message title ensuring the title format stays the same.\n\
             {emoji}\n{description_rule}\n{issue_rule}\n\
             The summarised commit message title needs to be less than {TITLE_LIMIT} characters. \
             Where there are multiple types (eg. fix, feat), this should be combined into the single most relevant type.\n\
             You should only output ONE commit message:\n{joined}",
            emoji = self.emoji_rule("summarised commit"),
        );

        vec![
            ChatMessage::system(format!(
                "{IDENTITY} Your mission is to summarise multiple commit messages into a single commit message."
            )),
            ChatMessage::user(instruction),
        ]
    }

    /// Token cost of the fixed messages sent with every diff prompt
    pub fn overhead(&self, budget: &TokenBudgetManager, estimator: &dyn TokenEstimator) -> usize {
        let messages = self.base_messages();
        let contents: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
        budget.prompt_overhead(estimator, &contents)
    }
}

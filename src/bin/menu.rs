// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use anyhow::anyhow;
use requestty::question::Choice;
use requestty::{Answer, DefaultSeparator, Question};

/// Select menu whose entries map back to typed keys. Separators carry no
/// key.
#[derive(Clone, Debug)]
pub struct Menu<K> {
    entries: Vec<(Choice<String>, Option<K>)>,
}

impl<K: Clone> Default for Menu<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Clone> Menu<K> {
    pub fn new() -> Self {
        Self { entries: vec![] }
    }

    pub fn add<V>(mut self, key: K, item: V) -> Self
    where
        V: Into<Choice<String>>,
    {
        self.entries.push((item.into(), Some(key)));
        self
    }

    pub fn separator(mut self) -> Self {
        self.entries.push((DefaultSeparator, None));
        self
    }

    /// Key of the selected entry, `None` if the answer is not one of ours
    pub fn answer(&self, answer: &Answer) -> Option<&K> {
        let index = answer.as_list_item()?.index;
        self.entries.get(index)?.1.as_ref()
    }

    /// Shows the menu under `message` and waits for a selection
    pub fn select<M: Into<String>>(&self, message: M) -> anyhow::Result<K> {
        let choices: Vec<Choice<String>> =
            self.entries.iter().map(|(choice, _)| choice.clone()).collect();
        let question = Question::select("menu")
            .message(message.into())
            .choices(choices)
            .build();

        let answer = requestty::prompt_one(question)?;
        self.answer(&answer)
            .cloned()
            .ok_or_else(|| anyhow!("Unknown menu entry"))
    }
}

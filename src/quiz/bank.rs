use super::Question;

struct BankEntry {
    id: &'static str,
    number: &'static str,
    text: &'static str,
    points: u32,
    guidance: &'static str,
    reinforcement: &'static str,
    clarification: &'static str,
}

// Sapir-Whorf check-in, in presentation order.
const BANK: [BankEntry; 14] = [
    BankEntry {
        id: "q1",
        number: "Q1",
        text: "In your own words, explain the referential function of language.",
        points: 3,
        guidance: "A strong answer should explain that the referential function is how language represents the world (people, objects, events, ideas) and that these representations can influence how we think about reality.",
        reinforcement: "✅ Great — you clearly explained how language helps us represent reality and shape understanding.",
        clarification: "❗Remember: “referential” isn’t about feelings or relationships — it’s about describing and categorising the world, which can affect thinking.",
    },
    BankEntry {
        id: "q2",
        number: "Q2",
        text: "In your own words, explain the affective function of language.",
        points: 3,
        guidance: "A strong answer should mention that affective language reflects social relationships, attitudes, identity, and interactions linked to power and status (e.g., politeness, authority, intimacy).",
        reinforcement: "✅ Good — you showed that language does more than convey information: it expresses social meaning and relationships.",
        clarification: "❗Affective language isn’t mainly about facts. It’s about how we position ourselves socially (respect, dominance, friendliness, distance).",
    },
    BankEntry {
        id: "q3",
        number: "Q3",
        text: "Define linguistic determinism in your own words.",
        points: 2,
        guidance: "A strong answer should state that linguistic determinism is the idea that language controls thought, and without words for something, people cannot think about it.",
        reinforcement: "✅ Correct — that’s the strong claim: language limits what we can think.",
        clarification: "❗Determinism is not just “language influences thought.” It is the strongest version: language controls/limits thought.",
    },
    BankEntry {
        id: "q4",
        number: "Q4",
        text: "Give ONE reason why strong linguistic determinism may not be true.",
        points: 3,
        guidance: "A strong answer should mention circumlocution (describing something indirectly) OR borrowing words from other languages, showing that people can express ideas even without a specific word.",
        reinforcement: "✅ Great — you used a strong counterargument showing thought can exist beyond vocabulary.",
        clarification: "❗A useful counterargument must show how people can still communicate/think without a direct word — e.g., by paraphrasing or borrowing.",
    },
    BankEntry {
        id: "q5",
        number: "Q5",
        text: "What does it mean to say “language is a guide to social reality”?",
        points: 3,
        guidance: "A strong answer should mention that language reflects cultural norms, priorities, and values, showing what a community pays attention to and considers important.",
        reinforcement: "✅ Great — you linked language to culture and priorities, showing how vocabulary reflects what matters.",
        clarification: "❗This doesn’t mean language creates reality. It often reflects what a society values and needs to talk about.",
    },
    BankEntry {
        id: "q6",
        number: "Q6",
        text: "What does the Garo of Assam example illustrate?",
        points: 3,
        guidance: "A strong answer should explain that having many words for baskets/rice/ants shows language can reflect cultural priorities, where people make fine distinctions in areas important to daily life.",
        reinforcement: "✅ Well done — you connected vocabulary richness to cultural importance and daily experience.",
        clarification: "❗It’s not just “they have many words.” The key point is why: language expands to mark distinctions that matter in that culture.",
    },
    BankEntry {
        id: "q7",
        number: "Q7",
        text: "What is communicative competence? Give one example.",
        points: 4,
        guidance: "A strong answer should define communicative competence as the ability to use and interpret language appropriately depending on context and audience. Example: speaking formally to a principal vs casually to a friend.",
        reinforcement: "✅ Strong — you showed that competence includes social appropriateness, not just grammar accuracy.",
        clarification: "❗Communicative competence isn’t only “speaking fluently.” It includes choosing the right language style for the situation.",
    },
    BankEntry {
        id: "q8",
        number: "Q8",
        text: "Explain how “nukespeak” shows language can shape thinking. Use one example.",
        points: 4,
        guidance: "A strong answer should explain that nukespeak uses euphemisms to reduce emotional impact and hide harm, shaping public perception. Example: “collateral damage” instead of “civilian deaths”, “clean bombs”.",
        reinforcement: "✅ Excellent — you explained how word choice manipulates perception and reduces awareness of human cost.",
        clarification: "❗Focus on the effect: nukespeak softens reality, making harm sound less serious and changing how people judge events.",
    },
    BankEntry {
        id: "q9",
        number: "Q9",
        text: "What is linguistic relativity? Use the “snow words” idea as an example.",
        points: 4,
        guidance: "A strong answer should explain that linguistic relativity means language influences thought and perception (not fully controls it). Example: having many snow words may reflect attention to differences in snow types.",
        reinforcement: "✅ Good — you explained relativity as influence and used the example to show attention to distinctions.",
        clarification: "❗Relativity is not “language controls thought.” It’s the softer idea: language can shape perception and habits.",
    },
    BankEntry {
        id: "q10",
        number: "Q10",
        text: "“Changing words can change thoughts.” Explain what PK illustrates, with one example of your own.",
        points: 4,
        guidance: "A strong answer should explain that changing wording changes how people interpret issues. Examples: “collateral damage” vs “civilian deaths”, “discipline” vs “punishment”, “illegal immigrant” vs “undocumented migrant”.",
        reinforcement: "✅ Great — your example clearly shows how framing affects judgement and emotion.",
        clarification: "❗Your example must show a real shift in meaning or emotional impact, not just replacing one random word with another.",
    },
    BankEntry {
        id: "q11",
        number: "Q11",
        text: "What does the “futureless language” TED talk suggest about language and behaviour?",
        points: 3,
        guidance: "A strong answer should explain that languages that use similar phrasing for present and future may encourage people to treat the future as more connected to now, so they may save more / plan more.",
        reinforcement: "✅ Nice — you linked language structure to future-oriented behaviour.",
        clarification: "❗Don’t just say “language affects saving.” Explain the link: future feels closer/less separate, which may influence choices.",
    },
    BankEntry {
        id: "q12",
        number: "Q12",
        text: "What is one advantage of being bilingual (from the reading)?",
        points: 3,
        guidance: "A strong answer should mention mental flexibility, switching perspectives, or adapting thinking depending on the language being used.",
        reinforcement: "✅ Great — you highlighted how bilinguals can shift viewpoints and interpret situations differently.",
        clarification: "❗Avoid vague claims like “bilinguals are smarter.” The reading focuses on flexibility and perspective-switching.",
    },
    BankEntry {
        id: "q13",
        number: "Q13",
        text: "Give TWO criticisms of the Sapir–Whorf hypothesis mentioned in the notes.",
        points: 4,
        guidance: "Any two: Idioms are hard to translate, Languages change and borrow words, People can paraphrase (circumlocution).",
        reinforcement: "✅ Excellent — these show why the strong “language controls thought” claim is too absolute.",
        clarification: "❗Criticisms should show how people can still express ideas even if their language doesn’t encode them directly.",
    },
    BankEntry {
        id: "q14",
        number: "Q14",
        text: "Reflection: Which concept is most convincing so far — referential function, affective function, determinism, or relativity? Why?",
        points: 5,
        guidance: "A strong answer chooses one concept and gives a clear reason + an example from the readings/notes (e.g., nukespeak, Garo vocabulary, bilingualism, futureless language).",
        reinforcement: "✅ Great — you supported your view with evidence and linked it to the reading ideas.",
        clarification: "❗Try to include one example and explain how it supports your chosen concept — not just a personal opinion.",
    },
];

pub fn questions() -> Vec<Question> {
    BANK.iter()
        .map(|entry| Question {
            id: entry.id.to_string(),
            number: entry.number.to_string(),
            text: entry.text.to_string(),
            points: entry.points,
            guidance: entry.guidance.to_string(),
            reinforcement: entry.reinforcement.to_string(),
            clarification: entry.clarification.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn bank_is_ordered_and_unique() {
        let questions = questions();
        assert_eq!(questions.len(), 14);
        assert_eq!(questions[0].id, "q1");
        assert_eq!(questions[13].number, "Q14");

        let ids: HashSet<_> = questions.iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids.len(), questions.len());
    }

    #[test]
    fn bank_carries_48_points() {
        assert_eq!(crate::quiz::max_score(&questions()), 48);
    }
}

//! Interview guides, one per participant type.

use super::participant::ParticipantType;

#[derive(Debug)]
pub struct GuideSection {
    pub heading: &'static str,
    pub prompts: &'static [&'static str],
}

#[derive(Debug)]
pub struct InterviewGuide {
    pub title: &'static str,
    pub objective: &'static str,
    pub sections: &'static [GuideSection],
}

impl InterviewGuide {
    /// Render the guide as plain text for a terminal or printout.
    pub fn to_text(&self) -> String {
        let mut out = format!("{}\n\nObjective:\n{}\n\nKey Prompts:\n", self.title, self.objective);
        for section in self.sections {
            out.push_str(&format!("\n{}:\n", section.heading));
            for prompt in section.prompts {
                out.push_str(&format!("  - \"{}\"\n", prompt));
            }
        }
        out
    }
}

static PATIENT: InterviewGuide = InterviewGuide {
    title: "Patient Interview Guide",
    objective: "Understand patients' experiences, treatment behaviours, and perspectives on integrating conventional and herbal care.",
    sections: &[
        GuideSection {
            heading: "Diagnosis Experience",
            prompts: &[
                "Can you walk me through the story of how you were first diagnosed with high blood pressure?",
                "How did you feel when you received the diagnosis?",
            ],
        },
        GuideSection {
            heading: "Treatment History & Daily Routines",
            prompts: &[
                "Since your diagnosis, what different treatments have you tried?",
                "Tell me about a typical day managing your medications.",
                "What kind of support have you received from family or health workers?",
            ],
        },
        GuideSection {
            heading: "Integration Perspectives",
            prompts: &[
                "Have you ever thought about combining conventional medication with herbal remedies?",
                "If a healthcare provider advised a combined approach, would you be open to it?",
            ],
        },
    ],
};

static CLINICIAN: InterviewGuide = InterviewGuide {
    title: "Clinician Interview Guide",
    objective: "Explore professional insights on treatment practices, patient behaviours, and openness to integrative strategies.",
    sections: &[
        GuideSection {
            heading: "Current Practice",
            prompts: &[
                "What are your most common treatment approaches for hypertension?",
                "What have you noticed about patients' adherence to treatment plans?",
            ],
        },
        GuideSection {
            heading: "Alternative Therapies",
            prompts: &["What patterns have you observed in patients' use of herbal remedies?"],
        },
        GuideSection {
            heading: "Integration Views",
            prompts: &[
                "What are your professional views on integrating herbal interventions?",
                "How open would you be to using digital tools for patient tracking?",
            ],
        },
    ],
};

static HERBALIST: InterviewGuide = InterviewGuide {
    title: "Herbalist Interview Guide",
    objective: "Capture knowledge of herbal care practices, patient patterns, and attitudes toward collaboration.",
    sections: &[
        GuideSection {
            heading: "Common Treatments",
            prompts: &[
                "Which specific herbs do you commonly use for managing high blood pressure?",
                "Can you describe a typical client who comes to you for hypertension?",
            ],
        },
        GuideSection {
            heading: "Integration & Collaboration",
            prompts: &[
                "What are your thoughts on conventional hospital-based hypertension treatment?",
                "Would you be willing to collaborate with clinics in a shared-care model?",
            ],
        },
        GuideSection {
            heading: "Digital Tools",
            prompts: &["How would you feel about recording patient data digitally?"],
        },
    ],
};

static CAREGIVER: InterviewGuide = InterviewGuide {
    title: "Caregiver Interview Guide",
    objective: "Understand the role of caregivers in supporting hypertensive patients and their beliefs about treatment.",
    sections: &[
        GuideSection {
            heading: "Care Role & Support",
            prompts: &[
                "What kind of support do you provide to the person you care for who has hypertension?",
                "Do you help with medication reminders or monitoring symptoms?",
            ],
        },
        GuideSection {
            heading: "Treatment Beliefs",
            prompts: &[
                "What are your thoughts on using conventional medicines versus herbs?",
                "Can you describe your interactions with health workers or herbalists?",
            ],
        },
        GuideSection {
            heading: "Integration Support",
            prompts: &["Would you support your relative in trying a combined treatment approach?"],
        },
    ],
};

static POLICYMAKER: InterviewGuide = InterviewGuide {
    title: "Policymaker Interview Guide",
    objective: "Understand policy perspectives on integrating digital health solutions and traditional medicine in hypertension management.",
    sections: &[
        GuideSection {
            heading: "Policy Environment",
            prompts: &[
                "What are current policies regarding traditional medicine integration in Ghana's health system?",
                "How familiar are you with digital health innovations for NCDs?",
            ],
        },
        GuideSection {
            heading: "Implementation Challenges",
            prompts: &[
                "What challenges do you foresee in implementing personalized digital health solutions?",
                "What regulatory changes would support safe integration of treatments?",
            ],
        },
        GuideSection {
            heading: "Digital Health Views",
            prompts: &["How do you view the role of digital platforms in healthcare delivery?"],
        },
    ],
};

static RESEARCHER: InterviewGuide = InterviewGuide {
    title: "Researcher Interview Guide",
    objective: "Understand researchers' experiences, perspectives, and attitudes toward studying hypertension and treatment practices in Ghana.",
    sections: &[
        GuideSection {
            heading: "Research Focus & Experience",
            prompts: &[
                "Can you tell me about your research on hypertension or related health issues?",
                "What motivated you to focus on hypertension research?",
            ],
        },
        GuideSection {
            heading: "Treatment Observations",
            prompts: &[
                "What have you observed about how communities manage hypertension?",
                "How do you view conventional medicines versus herbal remedies?",
            ],
        },
        GuideSection {
            heading: "Research Environment & Digital Tools",
            prompts: &[
                "What challenges have you faced conducting hypertension research in Ghana?",
                "What role can digital platforms play in collecting research data?",
            ],
        },
    ],
};

pub fn for_type(participant_type: ParticipantType) -> &'static InterviewGuide {
    match participant_type {
        ParticipantType::Patient => &PATIENT,
        ParticipantType::Clinician => &CLINICIAN,
        ParticipantType::Herbalist => &HERBALIST,
        ParticipantType::Caregiver => &CAREGIVER,
        ParticipantType::Policymaker => &POLICYMAKER,
        ParticipantType::Researcher => &RESEARCHER,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_type_has_a_titled_guide() {
        for t in ParticipantType::ALL {
            let guide = t.guide();
            assert!(guide.title.starts_with(t.display_name()));
            assert_eq!(guide.sections.len(), 3);
        }
    }

    #[test]
    fn test_guide_text_lists_prompts() {
        let text = ParticipantType::Herbalist.guide().to_text();
        assert!(text.starts_with("Herbalist Interview Guide"));
        assert!(text.contains("Digital Tools:"));
        assert!(text.contains("  - \"How would you feel about recording patient data digitally?\""));
    }
}

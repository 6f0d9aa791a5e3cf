//! Skill-tree catalog: the lessons a player unlocks in order.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkillNode {
    pub id: u32,
    pub title: &'static str,
    pub xp_reward: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct Section {
    pub title: &'static str,
    pub nodes: &'static [SkillNode],
}

pub const SECTIONS: &[Section] = &[
    Section {
        title: "Novice: Vocal Power",
        nodes: &[
            SkillNode { id: 1, title: "Volume Control", xp_reward: 50 },
            SkillNode { id: 2, title: "Pacing 101", xp_reward: 50 },
            SkillNode { id: 3, title: "Clarity", xp_reward: 75 },
        ],
    },
    Section {
        title: "Pro: The \"Um\" Slayer",
        nodes: &[
            SkillNode { id: 4, title: "Filler Words", xp_reward: 100 },
            SkillNode { id: 5, title: "Pause Power", xp_reward: 100 },
            SkillNode { id: 6, title: "Flow Master", xp_reward: 125 },
        ],
    },
    Section {
        title: "Master: Impromptu",
        nodes: &[
            SkillNode { id: 7, title: "Quick Think", xp_reward: 150 },
            SkillNode { id: 8, title: "Story Craft", xp_reward: 150 },
        ],
    },
];

/// All nodes in unlock order.
pub fn nodes() -> impl Iterator<Item = &'static SkillNode> {
    SECTIONS.iter().flat_map(|s| s.nodes.iter())
}

pub fn node(id: u32) -> Option<&'static SkillNode> {
    nodes().find(|n| n.id == id)
}

//! Canned replies used when the core runs without a live model.
//!
//! Selection is keyword driven and deterministic; only the pick within a
//! category and the simulated latency are random, both drawn from a
//! [`MockResponder`] that can be seeded.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::ops::RangeInclusive;
use std::sync::Mutex;
use std::time::Duration;

use crate::classifier::contains_any;

/// Simulated latency of a pipeline reply, in ms.
pub const PIPELINE_DELAY_MS: RangeInclusive<u64> = 300..=800;
/// Simulated latency of an agent reply, in ms.
pub const AGENT_DELAY_MS: RangeInclusive<u64> = 500..=1500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockCategory {
    Normal,
    Missing,
    Food,
    Tired,
    Happy,
    Sensitive,
    GenerationGap,
    BeingCriticized,
}

impl MockCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            MockCategory::Normal => "normal",
            MockCategory::Missing => "missing",
            MockCategory::Food => "food",
            MockCategory::Tired => "tired",
            MockCategory::Happy => "happy",
            MockCategory::Sensitive => "sensitive",
            MockCategory::GenerationGap => "generation_gap",
            MockCategory::BeingCriticized => "being_criticized",
        }
    }

    /// Priority: generation gap, criticized, tired, missing, food, happy,
    /// sensitive, then normal.
    pub fn for_caption(caption: &str) -> MockCategory {
        let text = caption.to_lowercase();

        if contains_any(&text, &["不理解", "总是", "又在", "每次都", "说了多少遍"]) {
            MockCategory::GenerationGap
        } else if contains_any(&text, &["不会", "怎么老", "没用", "自己不会"]) {
            MockCategory::BeingCriticized
        } else if contains_any(&text, &["累", "烦", "不想", "压力", "忙"]) {
            MockCategory::Tired
        } else if text.contains('想') && contains_any(&text, &["你", "她", "妈", "家"]) {
            MockCategory::Missing
        } else if contains_any(&text, &["吃", "做饭", "菜", "好吃", "快餐", "粥"]) {
            MockCategory::Food
        } else if contains_any(&text, &["开心", "太好了", "哈哈", "好消息"]) {
            MockCategory::Happy
        } else if contains_any(&text, &["钱", "工作", "结婚", "身体", "健康", "催", "医院"]) {
            MockCategory::Sensitive
        } else {
            MockCategory::Normal
        }
    }

    pub fn responses(&self) -> &'static [&'static str] {
        match self {
            MockCategory::Normal => NORMAL,
            MockCategory::Missing => MISSING,
            MockCategory::Food => FOOD,
            MockCategory::Tired => TIRED,
            MockCategory::Happy => HAPPY,
            MockCategory::Sensitive => SENSITIVE,
            MockCategory::GenerationGap => GENERATION_GAP,
            MockCategory::BeingCriticized => BEING_CRITICIZED,
        }
    }
}

const NORMAL: &[&str] = &[
    "这张照片好温馨呀～Wowli 感觉到满满的爱呢！想不想给她分享一下今天的心情？",
    "哇，看起来很棒呢！你有注意到照片里那个小细节吗？要不要配上一句话发给她？",
    "Wowli 觉得她看到一定会很开心的～如果你想的话，可以告诉她你在想什么",
    "好有生活气息的照片呀！她可能也很想知道你今天过得怎么样呢",
    "这个瞬间值得记录下来呢～Wowli 猜她一定很想了解你的近况",
];

const MISSING: &[&str] = &[
    "Wowli 觉得呀，思念是最温暖的情感呢～如果你想的话，可以直接告诉她",
    "有时候一句简单的「想你了」就够啦～她可能也在想你呢",
    "Wowli 感觉到你在想她～你们上次聊天是什么时候呀？",
];

const FOOD: &[&str] = &[
    "看起来好好吃呀！是在外面吃的还是自己做的呢？妈妈看到一定会问食谱的",
    "Wowli 的肚子也饿了呢～这道菜是什么味道？有没有让你想起什么？",
    "美食最适合分享啦！她看到肯定会想知道你吃得好不好～",
];

const TIRED: &[&str] = &[
    "辛苦啦～Wowli 在这里陪着你呢，不用什么都自己扛",
    "累了就休息一下吧，Wowli 懂你的。想聊聊吗？",
    "有时候说出来会好一些哦，Wowli 会一直在这里",
];

const HAPPY: &[&str] = &[
    "太棒啦！这么开心的事情，想不想分享给她一起开心？",
    "Wowli 也跟着开心起来了呢！她知道了一定也会很高兴的",
    "好消息值得一起庆祝呀！要不要告诉她？",
];

const SENSITIVE: &[&str] = &[
    "Wowli 在这里陪着你呢。这种事情确实不容易，不管怎样都会支持你的",
    "有些话题确实复杂呢... Wowli 懂的，不用勉强自己",
    "不管发生什么，Wowli 都会陪在你身边哦",
];

const GENERATION_GAP: &[&str] = &[
    "Wowli 觉得呀，她可能只是用她的方式在表达关心呢",
    "每个人表达爱的方式都不一样～她的方式可能和你期待的有些不同",
    "Wowli 猜，她背后可能藏着没说出口的担心呢",
];

const BEING_CRITICIZED: &[&str] = &[
    "Wowli 觉得呀，妈妈这样说可能是因为心疼你，想照顾你却够不着的感觉",
    "听起来有点严厉，但 Wowli 翻译一下：她其实是在说「我担心你」",
    "这话背后藏着的，可能是「我好想能帮到你」的心情呢",
];

/// Random source for mock picks and delays.
pub struct MockResponder {
    rng: Mutex<StdRng>,
}

impl MockResponder {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            rng: Mutex::new(rng),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self::new(Some(seed))
    }

    pub fn pick(&self, category: MockCategory) -> &'static str {
        let responses = category.responses();
        let index = self.with_rng(|rng| rng.random_range(0..responses.len()));
        responses[index]
    }

    pub fn delay(&self, range_ms: RangeInclusive<u64>) -> Duration {
        Duration::from_millis(self.with_rng(|rng| rng.random_range(range_ms)))
    }

    fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        // A panic mid-draw leaves the RNG usable.
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(caption: &str) -> MockCategory {
        MockCategory::for_caption(caption)
    }

    #[test]
    fn test_category_priority() {
        assert_eq!(category("妈妈总是说我"), MockCategory::GenerationGap);
        assert_eq!(category("你自己不会做饭吗"), MockCategory::BeingCriticized);
        assert_eq!(category("今天加班好累"), MockCategory::Tired);
        assert_eq!(category("想家了"), MockCategory::Missing);
        assert_eq!(category("今天吃了好吃的面"), MockCategory::Food);
        assert_eq!(category("哈哈好消息"), MockCategory::Happy);
        assert_eq!(category("体检说身体还行"), MockCategory::Sensitive);
        assert_eq!(category("公园的花开了"), MockCategory::Normal);
    }

    #[test]
    fn test_generation_gap_outranks_food() {
        assert_eq!(category("又在吃外卖"), MockCategory::GenerationGap);
    }

    #[test]
    fn test_same_seed_same_picks() {
        let a = MockResponder::seeded(7);
        let b = MockResponder::seeded(7);
        for _ in 0..10 {
            assert_eq!(a.pick(MockCategory::Normal), b.pick(MockCategory::Normal));
            assert_eq!(a.delay(PIPELINE_DELAY_MS), b.delay(PIPELINE_DELAY_MS));
        }
    }

    #[test]
    fn test_pick_stays_in_category() {
        let responder = MockResponder::new(None);
        for _ in 0..20 {
            assert!(FOOD.contains(&responder.pick(MockCategory::Food)));
        }
    }

    #[test]
    fn test_delay_within_range() {
        let responder = MockResponder::seeded(1);
        for _ in 0..50 {
            let ms = responder.delay(AGENT_DELAY_MS).as_millis() as u64;
            assert!(AGENT_DELAY_MS.contains(&ms));
        }
    }
}

//! Example prompt catalogue, grouped by vendor.

use callmodel_core::Vendor;

#[derive(Debug, Clone, Copy)]
pub struct ExamplePrompt {
    pub model_id: &'static str,
    pub prompt: &'static str,
    pub use_case: &'static str,
}

const APPLES: &str = "You are a very intelligent bot with exceptional critical thinking. \
I went to the market and bought 10 apples. I gave 2 apples to your friend and 2 to the helper. \
I then went and bought 5 more apples and ate 1. How many apples did I remain with? \
Provide step by step how you solved it.";

pub const CATALOGUE: &[ExamplePrompt] = &[
    ExamplePrompt {
        model_id: "anthropic.claude-3-haiku-20240307-v1:0",
        prompt: "Describe to me the image that is uploaded.",
        use_case: "Image-to-Text (needs the conditioning image in the bucket)",
    },
    ExamplePrompt {
        model_id: "anthropic.claude-3-sonnet-20240229-v1:0",
        prompt: "Write a sonnet about a lost kingdom.",
        use_case: "Text Generation",
    },
    ExamplePrompt {
        model_id: "anthropic.claude-v2:1",
        prompt: "Summarize the latest climate change research findings.",
        use_case: "Summarization",
    },
    ExamplePrompt {
        model_id: "anthropic.claude-instant-v1",
        prompt: "What is the essence of happiness?",
        use_case: "Instant Response",
    },
    ExamplePrompt {
        model_id: "mistral.mistral-7b-instruct-v0:2",
        prompt: "In Bash, how do I list all text files in the current directory \
                 (excluding subdirectories) that have been modified in the last month?",
        use_case: "Code Generation",
    },
    ExamplePrompt {
        model_id: "mistral.mixtral-8x7b-instruct-v0:1",
        prompt: "What is the difference between inorder and preorder traversal? \
                 Give an example in Python.",
        use_case: "Q&A and Code Generation",
    },
    ExamplePrompt {
        model_id: "meta.llama2-13b-chat-v1",
        prompt: APPLES,
        use_case: "Math",
    },
    ExamplePrompt {
        model_id: "meta.llama2-70b-chat-v1",
        prompt: APPLES,
        use_case: "Math & Compare Models",
    },
    ExamplePrompt {
        model_id: "amazon.titan-text-express-v1",
        prompt: "Summarize the action items from this meeting: Namita will simplify the landing page, \
                 Brant will remove the extra sign-up forms with James.",
        use_case: "Summarization",
    },
    ExamplePrompt {
        model_id: "amazon.titan-image-generator-v1",
        prompt: "A lighthouse on a rocky coast at dusk.",
        use_case: "Create Image",
    },
    ExamplePrompt {
        model_id: "cohere.command-text-v14",
        prompt: "Extract the band name from the contract: This Music Recording Agreement is made \
                 between Good Kid, a Toronto-based musical group, and Universal Music Group.",
        use_case: "Open-ended Text Generation",
    },
    ExamplePrompt {
        model_id: "stability.stable-diffusion-xl-v0",
        prompt: "Create an image of a cowboy riding a dinosaur on the moon.",
        use_case: "Create Image",
    },
    ExamplePrompt {
        model_id: "stability.stable-diffusion-xl-v1",
        prompt: "Create an image of a human-like person working in the middle of California.",
        use_case: "Create Image",
    },
    ExamplePrompt {
        model_id: "ai21.j2-mid-v1",
        prompt: "Write a persuasive and personalized Google ad for the following company. \
                 Company: Click Description: SEO services",
        use_case: "Text Generation",
    },
];

fn vendor_of(prompt: &ExamplePrompt) -> Vendor {
    let prefix = prompt.model_id.split('.').next().unwrap_or("");
    Vendor::from_prefix(prefix)
}

/// Prompts for one vendor.
pub fn for_vendor(vendor: Vendor) -> Vec<&'static ExamplePrompt> {
    CATALOGUE.iter().filter(|p| vendor_of(p) == vendor).collect()
}

/// Render the catalogue grouped under vendor headings.
pub fn render(vendor: Option<Vendor>) -> String {
    let mut out = String::new();
    for heading in Vendor::KNOWN {
        if vendor.is_some_and(|v| v != heading) {
            continue;
        }
        let prompts = for_vendor(heading);
        if prompts.is_empty() {
            continue;
        }
        out.push_str(&format!("\n  {}:\n", heading.as_str()));
        for p in prompts {
            out.push_str(&format!("    {:<42} [{}]\n", p.model_id, p.use_case));
            out.push_str(&format!("      {}\n", p.prompt));
        }
    }
    out
}
